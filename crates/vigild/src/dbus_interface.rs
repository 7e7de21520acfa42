use crate::engine::EngineStatus;
use zbus::interface;

pub const BUS_NAME: &str = "org.vigil.Vigil1";
pub const OBJECT_PATH: &str = "/org/vigil/Vigil1";

/// D-Bus control surface of the surveillance daemon.
///
/// Bus name: org.vigil.Vigil1
/// Object path: /org/vigil/Vigil1
pub struct VigilService {
    pub status: EngineStatus,
}

#[interface(name = "org.vigil.Vigil1")]
impl VigilService {
    /// Return daemon and session status as JSON.
    async fn status(&self) -> zbus::fdo::Result<String> {
        Ok(self.status.to_json().to_string())
    }

    /// Stop the engine after its current cycle. Returns whether it was running.
    async fn stop(&self) -> zbus::fdo::Result<bool> {
        let was_running = self.status.is_running();
        tracing::info!(was_running, "stop requested over D-Bus");
        self.status.stop();
        Ok(was_running)
    }
}

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::{
    error::AppError,
    game::gesture::{GestureConfig, GestureRecognizer, GestureSample, Observation},
    models::gesture::SensorStatus,
};

struct ControllerSession {
    recognizer: GestureRecognizer,
    sensor: SensorStatus,
    last_seen: Instant,
}

/// Gesture recognizers of every attached controller, keyed by (room, controller).
///
/// Sessions silent for longer than `idle_timeout` are dropped the next time
/// any controller reports in; a returning phone simply recalibrates.
pub struct ControllerRegistry {
    config: GestureConfig,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<(String, String), ControllerSession>>,
}

type Sessions = HashMap<(String, String), ControllerSession>;

impl ControllerRegistry {
    pub fn new(config: GestureConfig, idle_timeout: Duration) -> Self {
        Self {
            config,
            idle_timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> GestureConfig {
        self.config
    }

    fn new_session(&self) -> ControllerSession {
        ControllerSession {
            recognizer: GestureRecognizer::new(self.config),
            sensor: SensorStatus::Granted,
            last_seen: Instant::now(),
        }
    }

    fn evict_idle(&self, sessions: &mut Sessions) {
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen.elapsed() < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Dropped {} idle controller sessions", evicted);
        }
    }

    /// (Re)starts gesture tracking: the next sample becomes the rest position.
    pub fn activate(&self, room: &str, controller: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_idle(&mut sessions);
        sessions.insert(key(room, controller), self.new_session());
        info!("Controller {} activated in room {}", controller, room);
    }

    /// Records the sensor status the device reported. Anything but `Granted`
    /// switches the gesture path off until the next activation.
    pub fn report_sensor(&self, room: &str, controller: &str, status: SensorStatus) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_idle(&mut sessions);
        let session = sessions
            .entry(key(room, controller))
            .or_insert_with(|| self.new_session());
        session.sensor = status;
        session.last_seen = Instant::now();
        if status != SensorStatus::Granted {
            warn!(
                "Controller {} in room {} has no motion sensor ({:?}); buttons only",
                controller, room, status
            );
        }
    }

    /// Feeds one sample to the controller's recognizer, attaching it on first use.
    pub fn observe(
        &self,
        room: &str,
        controller: &str,
        sample: &GestureSample,
        round_active: bool,
    ) -> Result<Observation, AppError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        self.evict_idle(&mut sessions);
        let session = sessions
            .entry(key(room, controller))
            .or_insert_with(|| self.new_session());
        session.last_seen = Instant::now();

        if session.sensor != SensorStatus::Granted {
            return Err(AppError::SensorPermissionDenied);
        }

        let observation = session.recognizer.observe(sample, round_active);
        debug!(
            "Controller {} diff {:.1} armed {} event {:?}",
            controller, observation.diff, observation.armed, observation.event
        );
        Ok(observation)
    }

    pub fn detach(&self, room: &str, controller: &str) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(&key(room, controller)).is_some()
    }

    /// Drops every controller of `room`. Returns how many were attached.
    pub fn detach_room(&self, room: &str) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|(r, _), _| r != room);
        before - sessions.len()
    }
}

fn key(room: &str, controller: &str) -> (String, String) {
    (room.to_string(), controller.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::gesture::GestureEvent;

    fn registry() -> ControllerRegistry {
        ControllerRegistry::new(GestureConfig::new(20.0, 40.0).unwrap(), Duration::from_secs(600))
    }

    #[test]
    fn test_controllers_are_independent() {
        let registry = registry();
        registry
            .observe("r", "a", &GestureSample::at(0.0), true)
            .unwrap();
        registry
            .observe("r", "b", &GestureSample::at(90.0), true)
            .unwrap();

        // -50 from a's rest fires; b is calibrated at 90 so 40 is -50 for it too.
        let a = registry.observe("r", "a", &GestureSample::at(-50.0), true).unwrap();
        let b = registry.observe("r", "b", &GestureSample::at(40.0), true).unwrap();
        assert_eq!(a.event, Some(GestureEvent::Confirm));
        assert_eq!(b.event, Some(GestureEvent::Confirm));
    }

    #[test]
    fn test_denied_sensor_blocks_samples_until_activation() {
        let registry = registry();
        registry.report_sensor("r", "a", SensorStatus::Denied);
        let err = registry
            .observe("r", "a", &GestureSample::at(0.0), true)
            .unwrap_err();
        assert!(matches!(err, AppError::SensorPermissionDenied));

        registry.activate("r", "a");
        assert!(registry.observe("r", "a", &GestureSample::at(0.0), true).is_ok());
    }

    #[test]
    fn test_activation_recalibrates() {
        let registry = registry();
        registry.observe("r", "a", &GestureSample::at(0.0), true).unwrap();
        registry.activate("r", "a");
        let obs = registry.observe("r", "a", &GestureSample::at(-60.0), true).unwrap();
        assert_eq!(obs.diff, 0.0);
        assert!(obs.event.is_none());
    }

    #[test]
    fn test_detach_room_only_drops_that_room() {
        let registry = registry();
        registry.activate("r1", "a");
        registry.activate("r1", "b");
        registry.activate("r2", "a");

        assert_eq!(registry.detach_room("r1"), 2);
        assert!(!registry.detach("r1", "a"));
        assert!(registry.detach("r2", "a"));
    }

    #[test]
    fn test_idle_sessions_are_evicted() {
        let registry = ControllerRegistry::new(GestureConfig::default(), Duration::ZERO);
        registry.activate("abandoned", "a");
        registry.activate("live", "b");

        assert!(!registry.detach("abandoned", "a"));
        assert!(registry.detach("live", "b"));
    }
}

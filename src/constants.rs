/// Expected schema version for both sqlite stores.
/// Bump when the schema changes in a way that requires migration.
pub const EXPECTED_DB_VERSION: &str = "1";

/// Default timeout for outbound message delivery (seconds)
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 5;

/// Default temporary storage for freshly captured audio.
/// tmpfs on the target devices, so capture does not wear the SD card.
pub const DEFAULT_TEMP_PATH: &str = "/run/shm";

/// Default MQTT broker port
pub const DEFAULT_MQTT_PORT: u16 = 1883;

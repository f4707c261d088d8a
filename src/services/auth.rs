use crate::config::UploadConfig;
use rand::Rng;

const ID_PREFIX: &str = "img_";
const ID_SUFFIX_LENGTH: usize = 11;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Plain equality against the single shared upload secret.
///
/// When no secret is configured, or it is blank, every key is rejected.
pub fn validate_upload_key(config: &UploadConfig, key: &str) -> bool {
    match config.key.as_deref() {
        Some(expected) if !expected.is_empty() => key == expected,
        _ => false,
    }
}

/// `img_{unix-millis}_{random base-36}`. Unique enough for one bucket.
pub fn generate_media_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LENGTH)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}{}_{}", ID_PREFIX, millis, suffix)
}

//! External process helpers.

use std::path::Path;
use std::process::Command;

/// Whether `binary` resolves on `PATH` (or is an existing file path).
pub fn command_exists(binary: &str) -> bool {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(binary).is_file();
    }
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("slidecast-definitely-missing-binary"));
        assert!(!command_exists("/definitely/missing/ffmpeg"));
    }
}

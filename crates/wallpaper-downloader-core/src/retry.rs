use log::warn;

/// Run `operation` until it succeeds or `max_attempts` tries have failed.
///
/// Attempts are numbered from 1 and run back to back. Returns the first
/// success or the last error. `max_attempts` of 0 is treated as 1.
pub fn retry<T, E, F>(max_attempts: u32, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts => {
                warn!("Attempt {}/{} failed: {}. Will retry again", attempt, max_attempts, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_success_wins() {
        let mut calls = 0;
        let result: Result<u32, String> = retry(3, |attempt| {
            calls += 1;
            Ok(attempt)
        });
        assert_eq!(result, Ok(1));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_succeeds_on_last_attempt() {
        let result: Result<&str, String> = retry(3, |attempt| {
            if attempt < 3 {
                Err(format!("boom {}", attempt))
            } else {
                Ok("done")
            }
        });
        assert_eq!(result, Ok("done"));
    }

    #[test]
    fn test_returns_last_error_after_exhaustion() {
        let mut calls = 0;
        let result: Result<(), String> = retry(3, |attempt| {
            calls += 1;
            Err(format!("boom {}", attempt))
        });
        assert_eq!(result, Err("boom 3".to_string()));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _: Result<(), String> = retry(0, |_| {
            calls += 1;
            Err("nope".to_string())
        });
        assert_eq!(calls, 1);
    }
}

use chrono::Utc;

/// `run_<first target>_<unix seconds>`, safe to use as a file name.
pub fn new_run_id(first_target: &str) -> String {
    format!("run_{}_{}", sanitize_target(first_target), Utc::now().timestamp())
}

fn sanitize_target(target: &str) -> String {
    target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_has_no_path_separators() {
        let id = new_run_id("10.0.0.0/24");
        assert!(id.starts_with("run_10.0.0.0_24_"));
        assert!(!id.contains('/'));
    }

    #[test]
    fn ipv6_colons_are_replaced() {
        assert_eq!(sanitize_target("::1"), "__1");
    }
}

use anyhow::{Context, Result};

/// Open a URL in the user's default browser
///
/// # Errors
/// Returns error if browser cannot be opened (e.g., no browser available)
pub fn open_url(url: &str) -> Result<()> {
    webbrowser::open(url)
        .with_context(|| format!("Failed to open browser for URL: {}", url))?;
    Ok(())
}

/// Dashboard page for a cluster: `{dashboard_url}/clusters/{id}`
pub fn cluster_url(dashboard_url: &str, cluster_id: &str) -> String {
    format!("{}/clusters/{}", dashboard_url.trim_end_matches('/'), cluster_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_url() {
        assert_eq!(
            cluster_url("https://dashboard.example.org", "42"),
            "https://dashboard.example.org/clusters/42"
        );
        assert_eq!(
            cluster_url("https://dashboard.example.org/", "42"),
            "https://dashboard.example.org/clusters/42"
        );
    }
}

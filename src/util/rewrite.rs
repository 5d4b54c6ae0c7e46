use url::{Host, Url};

/// Extension point for mapping feed-provided article links whose host is a
/// raw IP or otherwise non-canonical domain back onto the blog's canonical
/// domain. Rewriting is not implemented; links currently pass through
/// unchanged, with a debug log when a raw-IP host is spotted.
pub fn replace_non_domain(link: &str, blog_url: &str) -> String {
    if let Ok(parsed) = Url::parse(link) {
        if matches!(parsed.host(), Some(Host::Ipv4(_) | Host::Ipv6(_))) {
            tracing::debug!(
                link,
                blog_url,
                "article link uses a raw IP host, rewrite not implemented"
            );
        }
    }
    link.to_string()
}

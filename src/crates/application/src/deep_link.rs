use crate::error::AppError;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkTarget {
    /// 分享的歌单
    Playlist { share_code: String },
    /// 其他路径，交给路由处理
    Other {
        path: String,
        params: Vec<(String, String)>,
    },
}

/// 解析 `<scheme>://...` 和 `https://<web_host>/...` 两种链接
#[derive(Debug, Clone)]
pub struct DeepLinks {
    scheme: String,
    web_host: String,
}

impl DeepLinks {
    pub fn new(scheme: &str, web_host: &str) -> Self {
        Self {
            scheme: scheme.to_ascii_lowercase(),
            web_host: web_host.to_ascii_lowercase(),
        }
    }

    pub fn parse(&self, link: &str) -> Result<DeepLinkTarget, AppError> {
        let url = Url::parse(link).map_err(|e| AppError::InvalidLink(format!("{}: {}", link, e)))?;
        let path = if url.scheme() == self.scheme {
            // coretet://playlist/abc 中 "playlist" 被解析成 host
            format!("/{}{}", url.host_str().unwrap_or_default(), url.path())
        } else if matches!(url.scheme(), "https" | "http")
            && url
                .host_str()
                .is_some_and(|h| h.eq_ignore_ascii_case(&self.web_host))
        {
            url.path().to_string()
        } else {
            return Err(AppError::InvalidLink(format!("Unsupported link: {}", link)));
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            ["playlist", code] => Ok(DeepLinkTarget::Playlist {
                share_code: code.to_string(),
            }),
            ["playlist"] => Err(AppError::InvalidLink(format!(
                "Missing playlist code: {}",
                link
            ))),
            _ => Ok(DeepLinkTarget::Other {
                path: format!("/{}", segments.join("/")),
                params: url
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
            }),
        }
    }

    pub fn is_deep_link(&self, link: &str) -> bool {
        self.parse(link).is_ok()
    }

    /// 网页分享链接
    pub fn share_link(&self, path: &str) -> String {
        format!("https://{}/{}", self.web_host, path.trim_start_matches('/'))
    }

    pub fn playlist_link(&self, share_code: &str) -> String {
        self.share_link(&format!("playlist/{}", share_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links() -> DeepLinks {
        DeepLinks::new("coretet", "coretet.app")
    }

    #[test]
    fn test_parse_custom_scheme_playlist() {
        assert_eq!(
            links().parse("coretet://playlist/Ab12cD").unwrap(),
            DeepLinkTarget::Playlist {
                share_code: "Ab12cD".to_string()
            }
        );
    }

    #[test]
    fn test_parse_web_playlist() {
        assert_eq!(
            links().parse("https://coretet.app/playlist/XYZ").unwrap(),
            DeepLinkTarget::Playlist {
                share_code: "XYZ".to_string()
            }
        );
    }

    #[test]
    fn test_other_path_keeps_params() {
        let target = links().parse("coretet://band/7?tab=works").unwrap();
        assert_eq!(
            target,
            DeepLinkTarget::Other {
                path: "/band/7".to_string(),
                params: vec![("tab".to_string(), "works".to_string())],
            }
        );
    }

    #[test]
    fn test_foreign_links_rejected() {
        assert!(links().parse("https://example.com/playlist/XYZ").is_err());
        assert!(links().parse("spotify://playlist/XYZ").is_err());
        assert!(links().parse("not a url").is_err());
        assert!(!links().is_deep_link("https://example.com/"));
    }

    #[test]
    fn test_missing_code_rejected() {
        assert!(links().parse("coretet://playlist/").is_err());
    }

    #[test]
    fn test_share_link() {
        assert_eq!(
            links().playlist_link("XYZ"),
            "https://coretet.app/playlist/XYZ"
        );
    }
}

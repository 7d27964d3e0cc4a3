use std::env;

use crate::application::services::document::ReferenceStyle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportBackend {
    Http,
    S3,
    Local,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub transport_backend: TransportBackend,
    pub asset_api_url: Option<String>,
    pub asset_api_token: Option<String>,
    pub uploads_dir: String,
    pub upload_max_bytes: usize,
    pub public_base_url: Option<String>,
    pub reference_style: ReferenceStyle,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_use_path_style: bool,
    pub s3_prefix: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let transport_backend = match non_empty("TRANSPORT_BACKEND")
            .unwrap_or_else(|| "local".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "http" => TransportBackend::Http,
            "s3" => TransportBackend::S3,
            "local" | "fs" | "filesystem" => TransportBackend::Local,
            other => anyhow::bail!("unsupported TRANSPORT_BACKEND: {other}"),
        };
        let asset_api_url = non_empty("ASSET_API_URL").map(|s| s.trim_end_matches('/').to_string());
        let asset_api_token = non_empty("ASSET_API_TOKEN");
        let uploads_dir = non_empty("UPLOADS_DIR").unwrap_or_else(|| "./uploads".into());
        let upload_max_bytes = non_empty("UPLOAD_MAX_BYTES")
            .and_then(|s| s.parse().ok())
            .unwrap_or(25 * 1024 * 1024);
        let public_base_url = non_empty("PUBLIC_BASE_URL").and_then(|v| {
            if v.starts_with("http://") || v.starts_with("https://") {
                Some(v.trim_end_matches('/').to_string())
            } else {
                None
            }
        });
        let reference_style = match non_empty("REFERENCE_STYLE") {
            Some(s) => ReferenceStyle::parse(&s)
                .ok_or_else(|| anyhow::anyhow!("unsupported REFERENCE_STYLE: {s}"))?,
            None => ReferenceStyle::Markdown,
        };
        let s3_use_path_style = matches!(
            non_empty("S3_USE_PATH_STYLE")
                .map(|s| s.to_ascii_lowercase())
                .as_deref(),
            Some("1") | Some("true") | Some("yes")
        );
        let s3_prefix = non_empty("S3_PREFIX")
            .map(|s| s.trim_matches('/').to_string())
            .unwrap_or_else(|| "images".into());

        let cfg = Self {
            transport_backend,
            asset_api_url,
            asset_api_token,
            uploads_dir,
            upload_max_bytes,
            public_base_url,
            reference_style,
            s3_bucket: non_empty("S3_BUCKET"),
            s3_region: non_empty("S3_REGION"),
            s3_endpoint: non_empty("S3_ENDPOINT"),
            s3_access_key: non_empty("S3_ACCESS_KEY"),
            s3_secret_key: non_empty("S3_SECRET_KEY"),
            s3_use_path_style,
            s3_prefix,
        };

        match cfg.transport_backend {
            TransportBackend::Http if cfg.asset_api_url.is_none() => {
                anyhow::bail!("ASSET_API_URL must be set when TRANSPORT_BACKEND=http")
            }
            TransportBackend::S3 if cfg.s3_bucket.is_none() => {
                anyhow::bail!("S3_BUCKET must be set when TRANSPORT_BACKEND=s3")
            }
            _ => {}
        }
        Ok(cfg)
    }
}

//! Server configuration, read once from the environment at startup.

use std::path::PathBuf;

/// Env keys:
///   DATABASE_URL          — Postgres connection string (required)
///   JWT_SECRET            — JWT HMAC secret (required)
///   BIND_ADDR             — listen address (default 0.0.0.0:4000)
///   FTP_STORAGE_PATH      — image storage root (default ./storage)
///   PUBLIC_URL_BASE       — public base, e.g. https://files.example.mn
///   PUBLIC_URL_PREFIX     — path prefix under the base (default uploads)
///   REPORT_TEMPLATE_FILE  — template filename under templates/
///   REPORT_IMAGE_WIDTH/HEIGHT — question-image bounding box (150×200)
///   SMTP_HOST/PORT/SECURE/USER/PASS/FROM — mail transport; host empty
///     disables mail entirely
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub storage_path: PathBuf,
    pub public_url_base: String,
    pub public_url_prefix: String,
    pub template_path: PathBuf,
    pub report_image_width: u32,
    pub report_image_height: u32,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url =
            var("DATABASE_URL").ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let jwt_secret =
            var("JWT_SECRET").ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?;

        let template_file =
            var("REPORT_TEMPLATE_FILE").unwrap_or_else(|| "inspection_report.docx".into());

        let smtp = var("SMTP_HOST").map(|host| SmtpConfig {
            host,
            port: var("SMTP_PORT").and_then(|v| v.parse().ok()).unwrap_or(587),
            secure: var("SMTP_SECURE").map(|v| v == "true").unwrap_or(true),
            username: var("SMTP_USER"),
            password: var("SMTP_PASS"),
            from: var("SMTP_FROM").unwrap_or_else(|| "inspection@localhost".into()),
        });

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:4000".into()),
            storage_path: var("FTP_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./storage")),
            public_url_base: var("PUBLIC_URL_BASE")
                .unwrap_or_else(|| "http://localhost:4000".into()),
            public_url_prefix: var("PUBLIC_URL_PREFIX").unwrap_or_else(|| "uploads".into()),
            template_path: PathBuf::from("templates").join(template_file),
            report_image_width: var("REPORT_IMAGE_WIDTH")
                .and_then(|v| v.parse().ok())
                .unwrap_or(150),
            report_image_height: var("REPORT_IMAGE_HEIGHT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(200),
            smtp,
        })
    }
}

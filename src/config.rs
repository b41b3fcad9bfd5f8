use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionSourceKind {
    Llm,
    Bank,
}

impl QuestionSourceKind {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "bank" | "fixed" => Self::Bank,
            _ => Self::Llm,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub question_source: QuestionSourceKind,
    pub question_bank_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let question_source = std::env::var("QUESTION_SOURCE")
            .map(|v| QuestionSourceKind::parse(&v))
            .unwrap_or(QuestionSourceKind::Llm);

        let question_bank_path = std::env::var("QUESTION_BANK_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            log_level,
            question_source,
            question_bank_path,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_question_source() {
        assert_eq!(QuestionSourceKind::parse("BANK"), QuestionSourceKind::Bank);
        assert_eq!(QuestionSourceKind::parse("llm"), QuestionSourceKind::Llm);
        assert_eq!(QuestionSourceKind::parse(""), QuestionSourceKind::Llm);
    }
}

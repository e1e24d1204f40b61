use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use arf_oracle::model::{DEFAULT_API_BASE, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};

const DEFAULT_ADDR: &str = "127.0.0.1:8788";
const DEFAULT_DATASET: &str = "public/arf.json";
const DEFAULT_PROVIDER_URL: &str = "http://127.0.0.1:8788";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "arfd", version, about = "arf oracle daemon and tree tooling.")]
struct CliArgs {
    /// Tracing filter directives; falls back to `RUST_LOG`.
    #[arg(long, env = "ARF_LOG", global = true)]
    log: Option<String>,

    #[arg(long, env = "ARF_DATASET", default_value = DEFAULT_DATASET, global = true)]
    dataset: PathBuf,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run the description oracle over HTTP.
    Serve(ServeArgs),
    /// Render the tool tree to SVG.
    Render(RenderArgs),
    /// Hover tools against a running oracle and print their tooltips.
    Describe(DescribeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "ARF_ADDR", default_value = DEFAULT_ADDR)]
    addr: SocketAddr,

    #[arg(long, env = "ARF_CF_ACCOUNT_ID")]
    cf_account_id: Option<String>,

    #[arg(long, env = "ARF_CF_API_TOKEN", hide_env_values = true)]
    cf_api_token: Option<String>,

    #[arg(long, env = "ARF_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, env = "ARF_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    max_tokens: u32,

    #[arg(long, env = "ARF_API_BASE", default_value = DEFAULT_API_BASE)]
    api_base: String,

    #[arg(
        long,
        env = "ARF_UPSTREAM_TIMEOUT_SECS",
        default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECS
    )]
    upstream_timeout_secs: u64,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Click the named node; repeat to expand deeper levels in order.
    #[arg(long = "expand", value_name = "NAME")]
    expand: Vec<String>,

    #[arg(
        long,
        env = "ARF_DARK",
        default_value_t = false,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    dark: bool,

    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DescribeArgs {
    #[arg(long, env = "ARF_PROVIDER_URL", default_value = DEFAULT_PROVIDER_URL)]
    provider: String,

    #[arg(required = true, value_name = "TOOL")]
    tools: Vec<String>,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct ArfConfig {
    pub log_filter: Option<String>,
    pub dataset: PathBuf,
    pub command: CommandConfig,
}

#[derive(Debug, Clone)]
pub enum CommandConfig {
    Serve(ServeConfig),
    Render(RenderConfig),
    Describe(DescribeConfig),
}

#[derive(Clone)]
pub struct ServeConfig {
    pub addr: SocketAddr,
    pub account_id: String,
    pub api_token: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_base: String,
    pub upstream_timeout: Option<Duration>,
}

impl fmt::Debug for ServeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeConfig")
            .field("addr", &self.addr)
            .field("account_id", &self.account_id)
            .field("api_token", &"<redacted>")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_base", &self.api_base)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub expand: Vec<String>,
    pub dark: bool,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DescribeConfig {
    pub provider: String,
    pub tools: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl ArfConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl TryFrom<CliArgs> for ArfConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.dataset.as_os_str().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "ARF_DATASET",
                value: String::new(),
            });
        }

        let command = match args.command {
            CliCommand::Serve(serve) => CommandConfig::Serve(ServeConfig::try_from(serve)?),
            CliCommand::Render(render) => CommandConfig::Render(RenderConfig::try_from(render)?),
            CliCommand::Describe(describe) => {
                CommandConfig::Describe(DescribeConfig::try_from(describe)?)
            }
        };

        Ok(Self {
            log_filter: non_blank(args.log),
            dataset: args.dataset,
            command,
        })
    }
}

impl TryFrom<ServeArgs> for ServeConfig {
    type Error = ConfigError;

    fn try_from(args: ServeArgs) -> Result<Self, Self::Error> {
        let account_id =
            non_blank(args.cf_account_id).ok_or(ConfigError::MissingSetting("ARF_CF_ACCOUNT_ID"))?;
        let api_token =
            non_blank(args.cf_api_token).ok_or(ConfigError::MissingSetting("ARF_CF_API_TOKEN"))?;

        if args.model.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "ARF_MODEL",
                value: args.model,
            });
        }
        if args.max_tokens == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "ARF_MAX_TOKENS",
                value: args.max_tokens.to_string(),
            });
        }
        if !args.api_base.starts_with("http://") && !args.api_base.starts_with("https://") {
            return Err(ConfigError::InvalidSetting {
                name: "ARF_API_BASE",
                value: args.api_base,
            });
        }

        let upstream_timeout = if args.upstream_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(args.upstream_timeout_secs))
        };

        Ok(Self {
            addr: args.addr,
            account_id,
            api_token,
            model: args.model.trim().to_string(),
            max_tokens: args.max_tokens,
            api_base: args.api_base,
            upstream_timeout,
        })
    }
}

impl TryFrom<RenderArgs> for RenderConfig {
    type Error = ConfigError;

    fn try_from(args: RenderArgs) -> Result<Self, Self::Error> {
        let mut expand = Vec::with_capacity(args.expand.len());
        for name in args.expand {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::InvalidSetting {
                    name: "--expand",
                    value: name,
                });
            }
            expand.push(trimmed.to_string());
        }

        Ok(Self {
            expand,
            dark: args.dark,
            output: args.output,
        })
    }
}

impl TryFrom<DescribeArgs> for DescribeConfig {
    type Error = ConfigError;

    fn try_from(args: DescribeArgs) -> Result<Self, Self::Error> {
        let provider = non_blank(Some(args.provider))
            .ok_or(ConfigError::MissingSetting("ARF_PROVIDER_URL"))?;

        let mut tools = Vec::with_capacity(args.tools.len());
        for tool in args.tools {
            let trimmed = tool.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::InvalidSetting {
                    name: "TOOL",
                    value: tool,
                });
            }
            tools.push(trimmed.to_string());
        }
        if tools.is_empty() {
            return Err(ConfigError::MissingSetting("TOOL"));
        }

        Ok(Self { provider, tools })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_serve_args() -> ServeArgs {
        ServeArgs {
            addr: DEFAULT_ADDR.parse().expect("valid addr"),
            cf_account_id: Some("acct".to_string()),
            cf_api_token: Some("token".to_string()),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            api_base: DEFAULT_API_BASE.to_string(),
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
        }
    }

    fn base_args(command: CliCommand) -> CliArgs {
        CliArgs {
            log: None,
            dataset: PathBuf::from(DEFAULT_DATASET),
            command,
        }
    }

    #[test]
    fn serve_defaults_are_valid() {
        let config = ArfConfig::try_from(base_args(CliCommand::Serve(base_serve_args())))
            .expect("config should be valid");

        assert_eq!(config.dataset, PathBuf::from(DEFAULT_DATASET));
        let CommandConfig::Serve(serve) = config.command else {
            panic!("expected serve config");
        };
        assert_eq!(serve.addr.to_string(), DEFAULT_ADDR);
        assert_eq!(serve.max_tokens, 150);
        assert_eq!(serve.upstream_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn serve_requires_credentials() {
        let mut args = base_serve_args();
        args.cf_account_id = None;
        let err = ServeConfig::try_from(args).expect_err("account id is required");
        assert!(matches!(err, ConfigError::MissingSetting("ARF_CF_ACCOUNT_ID")));

        let mut args = base_serve_args();
        args.cf_api_token = Some("   ".to_string());
        let err = ServeConfig::try_from(args).expect_err("token is required");
        assert!(matches!(err, ConfigError::MissingSetting("ARF_CF_API_TOKEN")));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let mut args = base_serve_args();
        args.upstream_timeout_secs = 0;
        let config = ServeConfig::try_from(args).expect("config should be valid");
        assert_eq!(config.upstream_timeout, None);
    }

    #[test]
    fn rejects_zero_max_tokens_and_bad_api_base() {
        let mut args = base_serve_args();
        args.max_tokens = 0;
        assert!(matches!(
            ServeConfig::try_from(args),
            Err(ConfigError::InvalidSetting {
                name: "ARF_MAX_TOKENS",
                ..
            })
        ));

        let mut args = base_serve_args();
        args.api_base = "api.cloudflare.com".to_string();
        assert!(matches!(
            ServeConfig::try_from(args),
            Err(ConfigError::InvalidSetting {
                name: "ARF_API_BASE",
                ..
            })
        ));
    }

    #[test]
    fn debug_output_redacts_the_token() {
        let config = ServeConfig::try_from(base_serve_args()).expect("config should be valid");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("\"token\""));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn describe_trims_tools_and_rejects_blanks() {
        let config = DescribeConfig::try_from(DescribeArgs {
            provider: DEFAULT_PROVIDER_URL.to_string(),
            tools: vec![" Sherlock ".to_string(), "Maltego".to_string()],
        })
        .expect("config should be valid");
        assert_eq!(config.tools, vec!["Sherlock", "Maltego"]);

        let err = DescribeConfig::try_from(DescribeArgs {
            provider: DEFAULT_PROVIDER_URL.to_string(),
            tools: vec!["  ".to_string()],
        })
        .expect_err("blank tool is invalid");
        assert!(matches!(err, ConfigError::InvalidSetting { name: "TOOL", .. }));
    }

    #[test]
    fn parses_render_subcommand() {
        let args = CliArgs::try_parse_from([
            "arfd",
            "render",
            "--expand",
            "Username",
            "--expand",
            "Email Address",
            "--dark",
            "true",
        ])
        .expect("arguments should parse");
        let config = ArfConfig::try_from(args).expect("config should be valid");

        let CommandConfig::Render(render) = config.command else {
            panic!("expected render config");
        };
        assert_eq!(render.expand, vec!["Username", "Email Address"]);
        assert!(render.dark);
        assert!(render.output.is_none());
    }
}

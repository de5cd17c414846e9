use clap::Args;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Args, Debug)]
pub struct TokenArgs {
    #[arg(long, help = "Subject (user id)")]
    pub sub: String,

    #[arg(long = "app", help = "Application id")]
    pub app_id: String,

    #[arg(long = "org", help = "Organization id")]
    pub org_id: String,

    #[arg(long = "permission", help = "Permission to grant (repeatable)")]
    pub permissions: Vec<String>,
}

pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let claims = Claims::new(args.sub, args.app_id, args.org_id, args.permissions);
    let token = generate_jwt(&claims)?;

    match output_format {
        OutputFormat::Json => output_success(
            output_format,
            "Token generated",
            Some(json!({ "token": token, "expires_at": claims.exp })),
        ),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}

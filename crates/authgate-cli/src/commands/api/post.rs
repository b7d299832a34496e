//! POST command implementation.

use anyhow::{Context, Result};
use authgate::ApiRequest;
use clap::Args;

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Request path, e.g. /api/images
    pub path: String,

    /// JSON request body
    #[arg(long)]
    pub json: Option<String>,
}

pub fn request(args: PostArgs) -> Result<ApiRequest> {
    let request = ApiRequest::post(args.path);
    match args.json {
        Some(body) => {
            let body: serde_json::Value =
                serde_json::from_str(&body).context("--json is not valid JSON")?;
            Ok(request.with_json(body))
        }
        None => Ok(request),
    }
}

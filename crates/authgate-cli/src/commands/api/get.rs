//! GET command implementation.

use authgate::ApiRequest;
use clap::Args;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Request path, e.g. /api/images
    pub path: String,
}

pub fn request(args: GetArgs) -> ApiRequest {
    ApiRequest::get(args.path)
}

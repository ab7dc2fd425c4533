//! Reply texts shown to chat users
//!
//! All dynamic parts (URLs, upstream bodies, error descriptions) are
//! HTML-escaped because replies are sent with `ParseMode::Html`.

use crate::config::TELEGRAM_MESSAGE_LIMIT;
use crate::relay::UploadOutcome;
use crate::utils::escape_truncated;

// Room left for the fixed wording around embedded text
const EMBED_LIMIT: usize = TELEGRAM_MESSAGE_LIMIT - 200;

/// Greeting sent on `/start`
pub const GREETING: &str =
    "<b>Hello!</b> Send me the remote video URL and I will upload it to Bunny Stream.";

/// Usage hint appended to the command list on `/help`
pub const USAGE_HINT: &str =
    "Send a direct link to a video file (for example <code>https://cdn.example.com/clip.mp4</code>) and it will be uploaded to the video library.";

/// Reply for anything that is not a URL
pub const CANNOT_PROCESS: &str = "Sorry, I can only process video URLs.";

/// Reply after a successful relay
pub const UPLOAD_SUCCEEDED: &str = "✅ Video uploaded successfully to Bunny Stream!";

/// Acknowledgment sent before the relay starts
#[must_use]
pub fn upload_started(source_url: &str) -> String {
    format!(
        "⏳ Got it! Uploading the video from: <code>{}</code> to Bunny Stream...",
        escape_truncated(source_url, EMBED_LIMIT)
    )
}

/// Help text: generated command list plus usage hint
#[must_use]
pub fn help_text(command_list: &str) -> String {
    format!(
        "{}\n\n{USAGE_HINT}",
        html_escape::encode_text(command_list)
    )
}

/// Map a relay outcome to its reply text
#[must_use]
pub fn render_outcome(outcome: &UploadOutcome) -> String {
    match outcome {
        UploadOutcome::Success => UPLOAD_SUCCEEDED.to_string(),
        UploadOutcome::DownloadFailed {
            status_code,
            reason,
        } => format!(
            "❌ Failed to download the video from the provided URL (HTTP {status_code} {}).",
            html_escape::encode_text(reason)
        ),
        UploadOutcome::UploadFailed {
            status_code,
            response_body,
        } => format!(
            "❌ Failed to upload the video (HTTP {status_code}): {}",
            escape_truncated(response_body, EMBED_LIMIT)
        ),
        UploadOutcome::TransportError { message } => format!(
            "⚠️ An error occurred: {}",
            escape_truncated(message, EMBED_LIMIT)
        ),
    }
}

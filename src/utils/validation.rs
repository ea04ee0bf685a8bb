use lazy_static::lazy_static;
use regex::Regex;
use validator::Validate;
use crate::errors::AppError;
use crate::models::study_log::ActivityType;

lazy_static! {
    static ref YOUTUBE_URL: Regex =
        Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+$").expect("valid YouTube regex");
    static ref SHORT_LINK: Regex =
        Regex::new(r"^(?:https?://)?(?:www\.)?youtu\.be/([^/?#&]*)").expect("valid short link regex");
    static ref WATCH_LINK: Regex =
        Regex::new(r"^(?:https?://)?(?:www\.)?youtube\.com/watch(?:\?([^#]*))?(?:#.*)?$").expect("valid watch link regex");
}

const MAX_TZ_OFFSET_MINUTES: i32 = 14 * 60;

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate()
        .map_err(|err| AppError::BadRequest(err.to_string()))
}

/// Types a user may log by hand. Milestone rows come from claims only.
pub fn validate_activity_type(activity_type: &str) -> Result<ActivityType, AppError> {
    let parsed = activity_type
        .parse::<ActivityType>()
        .map_err(AppError::BadRequest)?;
    if !parsed.is_loggable() {
        return Err(AppError::BadRequest(
            "Activity type must be one of Reading, Listening, Grammar or Speaking".to_string(),
        ));
    }
    Ok(parsed)
}

pub fn validate_tz_offset(minutes: i32) -> Result<(), AppError> {
    if minutes.abs() > MAX_TZ_OFFSET_MINUTES {
        return Err(AppError::BadRequest("Timezone offset must be within ±14 hours".to_string()));
    }
    Ok(())
}

/// Trims `value` and rejects it if nothing is left.
pub fn require_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Checks a YouTube link and rewrites it to its embed form.
///
/// Empty input means "no video" and yields `None`. `youtu.be/<id>` and
/// `youtube.com/watch?v=<id>` become `https://www.youtube.com/embed/<id>`;
/// other YouTube URLs are stored as given.
pub fn normalize_video_url(raw: Option<&str>) -> Result<Option<String>, AppError> {
    let url = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(url) => url,
    };

    if !YOUTUBE_URL.is_match(url) {
        return Err(AppError::BadRequest("Please enter a valid YouTube URL.".to_string()));
    }

    if let Some(caps) = SHORT_LINK.captures(url) {
        let video_id = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        return Ok(Some(embed_url(require_video_id(video_id)?)));
    }

    if let Some(caps) = WATCH_LINK.captures(url) {
        let video_id = caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or_default()
            .split('&')
            .find_map(|pair| pair.strip_prefix("v="))
            .unwrap_or_default();
        return Ok(Some(embed_url(require_video_id(video_id)?)));
    }

    Ok(Some(url.to_string()))
}

fn require_video_id(video_id: &str) -> Result<&str, AppError> {
    if video_id.is_empty() {
        return Err(AppError::BadRequest("YouTube link is missing a video id".to_string()));
    }
    Ok(video_id)
}

fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_links_become_embeds() {
        assert_eq!(
            normalize_video_url(Some("https://youtu.be/abc123")).unwrap(),
            Some("https://www.youtube.com/embed/abc123".to_string())
        );
    }

    #[test]
    fn short_links_drop_query_and_fragment() {
        assert_eq!(
            normalize_video_url(Some("https://youtu.be/dQw4w9WgXcQ?t=30")).unwrap(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            normalize_video_url(Some("youtu.be/dQw4w9WgXcQ#intro")).unwrap(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string())
        );
        assert!(normalize_video_url(Some("https://youtu.be/?t=30")).is_err());
    }

    #[test]
    fn shared_watch_links_are_matched_by_host() {
        assert_eq!(
            normalize_video_url(Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ&feature=youtu.be")).unwrap(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            normalize_video_url(Some("youtube.com/watch?v=dQw4w9WgXcQ#t=10")).unwrap(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn watch_links_become_embeds() {
        assert_eq!(
            normalize_video_url(Some(" https://www.youtube.com/watch?list=x&v=dQw4w9WgXcQ ")).unwrap(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ".to_string())
        );
        assert!(normalize_video_url(Some("https://www.youtube.com/watch?list=x")).is_err());
    }

    #[test]
    fn embed_links_pass_through() {
        let url = "https://www.youtube.com/embed/xyz";
        assert_eq!(normalize_video_url(Some(url)).unwrap(), Some(url.to_string()));
    }

    #[test]
    fn blank_video_is_none_and_others_rejected() {
        assert_eq!(normalize_video_url(None).unwrap(), None);
        assert_eq!(normalize_video_url(Some("   ")).unwrap(), None);
        assert!(normalize_video_url(Some("https://vimeo.com/123")).is_err());
    }

    #[test]
    fn milestone_cannot_be_logged_by_hand() {
        assert!(validate_activity_type("Milestone").is_err());
        assert!(validate_activity_type("Cooking").is_err());
        assert_eq!(validate_activity_type("Listening").unwrap(), ActivityType::Listening);
    }

    #[test]
    fn offsets_are_bounded() {
        assert!(validate_tz_offset(540).is_ok());
        assert!(validate_tz_offset(-840).is_ok());
        assert!(validate_tz_offset(900).is_err());
    }

    #[test]
    fn require_text_trims() {
        assert_eq!(require_text("  hi ", "Title").unwrap(), "hi");
        assert!(require_text("   ", "Title").is_err());
    }
}

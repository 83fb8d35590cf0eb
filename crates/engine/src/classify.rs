use labelsync_remote::models::MediaCategory;

// Order matters: the first group with a matching extension wins.
const EXTENSION_GROUPS: [(MediaCategory, &[&str]); 4] = [
    (MediaCategory::Image, &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"]),
    (MediaCategory::Audio, &["mp3", "wav", "flac", "aac", "ogg"]),
    (MediaCategory::Video, &["mp4", "avi", "mov", "wmv", "flv", "webm"]),
    (MediaCategory::Text, &["txt", "doc", "docx", "pdf"]),
];

/// Classify a file's type descriptor into the media category used to shape
/// its task payload.
///
/// The descriptor may be a bare extension (`"JPG"`, `".wav"`) or mime-like
/// (`"video/mp4"`). Mime-like descriptors are classified by their top-level
/// type when it names a category; otherwise the descriptor is matched
/// case-insensitively against fixed extension groups. Anything unrecognised,
/// including the empty string, is an [`Image`](MediaCategory::Image).
///
/// ```
/// use labelsync_engine::classify;
/// use labelsync_remote::models::MediaCategory;
///
/// assert_eq!(classify("FLAC"), MediaCategory::Audio);
/// assert_eq!(classify("text/csv"), MediaCategory::Text);
/// assert_eq!(classify(""), MediaCategory::Image);
/// ```
pub fn classify(type_descriptor: &str) -> MediaCategory {
    let descriptor = type_descriptor.trim().to_lowercase();
    if let Some((top_level, _)) = descriptor.split_once('/')
        && let Some(category) = category_named(top_level)
    {
        return category;
    }
    EXTENSION_GROUPS
        .iter()
        .find(|(_, extensions)| extensions.iter().any(|extension| descriptor.contains(extension)))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

/// Classify a source dataset's type code (e.g. `"AUDIO_TRANSCRIPTION"`) into
/// the media category its destination project should be set up for.
pub fn classify_dataset_kind(kind_code: Option<&str>) -> MediaCategory {
    let Some(code) = kind_code.map(str::to_lowercase) else {
        return MediaCategory::default();
    };
    [MediaCategory::Audio, MediaCategory::Video, MediaCategory::Text]
        .into_iter()
        .find(|category| code.contains(category.as_str()))
        .unwrap_or_default()
}

fn category_named(name: &str) -> Option<MediaCategory> {
    match name {
        "image" => Some(MediaCategory::Image),
        "audio" => Some(MediaCategory::Audio),
        "video" => Some(MediaCategory::Video),
        "text" => Some(MediaCategory::Text),
        _ => None,
    }
}

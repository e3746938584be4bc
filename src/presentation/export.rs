use crate::application::models::comment::Comment;
use crate::application::models::media::MediaInfoRecord;
use crate::error::ClientError;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column index where the XLSX comment table starts, leaving two empty
/// columns after the metadata block.
const COMMENT_TABLE_START_COL: u16 = 16;

/// File format written by [`export_post`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// One exported comment row, column-for-column what the sheet carries.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentRow {
    pub number: usize,
    pub nickname: String,
    pub handle: String,
    pub user_url: String,
    pub text: String,
    pub time: String,
    pub likes: u64,
    pub profile_pic_url: String,
    pub followers: u64,
    pub is_reply: bool,
    pub replied_to: String,
    pub reply_count: u64,
}

impl CommentRow {
    pub const HEADERS: [&'static str; 12] = [
        "Comment Number (ID)",
        "Nickname",
        "User @",
        "User URL",
        "Comment Text",
        "Time",
        "Likes",
        "Profile Picture URL",
        "Followers",
        "Is 2nd Level Comment",
        "User Replied To",
        "Number of Replies",
    ];

    pub fn from_comment(number: usize, comment: &Comment) -> Self {
        let username = &comment.user.username;
        Self {
            number,
            nickname: username.clone(),
            handle: format!("@{username}"),
            user_url: format!("https://instagram.com/{username}"),
            text: comment.text.clone(),
            time: comment
                .created_at()
                .map_or(String::new(), |t| t.format(TIME_FORMAT).to_string()),
            likes: comment.comment_like_count,
            profile_pic_url: comment.user.profile_pic_url.clone().unwrap_or_default(),
            // Follower counts are not available from the comment payload.
            followers: 0,
            is_reply: comment.is_reply(),
            replied_to: String::new(),
            reply_count: comment.child_comment_count,
        }
    }

    fn values(&self) -> Vec<String> {
        vec![
            self.number.to_string(),
            self.nickname.clone(),
            self.handle.clone(),
            self.user_url.clone(),
            self.text.clone(),
            self.time.clone(),
            self.likes.to_string(),
            self.profile_pic_url.clone(),
            self.followers.to_string(),
            self.is_reply.to_string(),
            self.replied_to.clone(),
            self.reply_count.to_string(),
        ]
    }
}

/// Builds the ordered metadata mapping for one post.
pub fn build_post_metadata(
    record: &MediaInfoRecord,
    url: &str,
    comments: &[CommentRow],
) -> Vec<(String, String)> {
    let username = &record.user.username;
    let lvl1 = comments.iter().filter(|c| !c.is_reply).count();
    let lvl2 = comments.len() - lvl1;
    let publish_time = record
        .taken_at_utc()
        .map_or(String::new(), |t| t.format(TIME_FORMAT).to_string());

    vec![
        ("Now", Utc::now().format(TIME_FORMAT).to_string()),
        ("Post URL", url.to_string()),
        ("Publisher Nickname", username.clone()),
        ("Publisher @", format!("@{username}")),
        ("Publisher URL", format!("https://instagram.com/{username}")),
        ("Publish Time", publish_time),
        ("Post Likes", record.like_count.to_string()),
        ("Post Shares", "0".to_string()),
        ("Description", record.caption_text().to_string()),
        ("Number of 1st level comments", lvl1.to_string()),
        ("Number of 2nd level comments", lvl2.to_string()),
        ("Total Comments (actual)", comments.len().to_string()),
        (
            "Total Comments (platform says)",
            record.comment_count.to_string(),
        ),
        (
            "Difference",
            (record.comment_count as i64 - comments.len() as i64).to_string(),
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Writes one file per post under `<output_dir>/<platform>/<stem>.<ext>` in
/// the requested format.
pub fn export_post(
    format: ExportFormat,
    metadata: &[(String, String)],
    comments: &[CommentRow],
    output_dir: &Path,
    platform: &str,
    stem: &str,
) -> Result<PathBuf, ClientError> {
    match format {
        ExportFormat::Csv => export_to_csv(metadata, comments, output_dir, platform, stem),
        ExportFormat::Xlsx => export_to_xlsx(metadata, comments, output_dir, platform, stem),
    }
}

/// Writes one CSV file under `<output_dir>/<platform>/<stem>.csv`: metadata
/// header and value rows, a blank separator record, then the comment table.
/// A failed write is retried once with a sanitized filename before the error
/// propagates.
pub fn export_to_csv(
    metadata: &[(String, String)],
    comments: &[CommentRow],
    output_dir: &Path,
    platform: &str,
    stem: &str,
) -> Result<PathBuf, ClientError> {
    write_with_retry(output_dir, platform, stem, "csv", |path| {
        write_csv_file(path, metadata, comments)
    })
}

/// Writes one XLSX workbook under `<output_dir>/<platform>/<stem>.xlsx`: the
/// metadata block in the leftmost columns and the comment table to its right,
/// with the same sanitized-filename retry as the CSV path.
pub fn export_to_xlsx(
    metadata: &[(String, String)],
    comments: &[CommentRow],
    output_dir: &Path,
    platform: &str,
    stem: &str,
) -> Result<PathBuf, ClientError> {
    write_with_retry(output_dir, platform, stem, "xlsx", |path| {
        write_xlsx_file(path, metadata, comments)
    })
}

fn write_with_retry(
    output_dir: &Path,
    platform: &str,
    stem: &str,
    extension: &str,
    write: impl Fn(&Path) -> Result<(), ClientError>,
) -> Result<PathBuf, ClientError> {
    let dir = output_dir.join(platform);
    fs::create_dir_all(&dir)?;

    let path = dir.join(format!("{stem}.{extension}"));
    match write(&path) {
        Ok(()) => {
            info!("exported: {}", path.display());
            Ok(path)
        }
        Err(e) => {
            let safe = dir.join(format!("{}.{extension}", sanitize_stem(stem)));
            warn!(
                "export to {} failed ({e}), retrying as {}",
                path.display(),
                safe.display()
            );
            write(&safe)?;
            info!("exported: {}", safe.display());
            Ok(safe)
        }
    }
}

fn write_csv_file(
    path: &Path,
    metadata: &[(String, String)],
    comments: &[CommentRow],
) -> Result<(), ClientError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;

    writer.write_record(metadata.iter().map(|(k, _)| k.as_str()))?;
    writer.write_record(metadata.iter().map(|(_, v)| v.as_str()))?;

    // Blank separator line between the metadata block and the comment table.
    writer.write_record([""])?;

    if !comments.is_empty() {
        writer.write_record(CommentRow::HEADERS)?;
        for comment in comments {
            writer.write_record(comment.values())?;
        }
    }

    writer.flush().map_err(ClientError::Io)?;
    Ok(())
}

fn write_xlsx_file(
    path: &Path,
    metadata: &[(String, String)],
    comments: &[CommentRow],
) -> Result<(), ClientError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let metadata_header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xDDDDDD))
        .set_align(FormatAlign::Center);
    let comment_header = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xCCCCCC))
        .set_align(FormatAlign::Center);

    for (col, (key, value)) in metadata.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, key, &metadata_header)?;
        worksheet.write_string(1, col, value)?;
    }

    if !comments.is_empty() {
        for (offset, header) in CommentRow::HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(
                0,
                COMMENT_TABLE_START_COL + offset as u16,
                *header,
                &comment_header,
            )?;
        }
        // Comment data starts one row below the metadata values.
        for (row, comment) in comments.iter().enumerate() {
            for (offset, value) in comment.values().into_iter().enumerate() {
                worksheet.write_string(
                    row as u32 + 2,
                    COMMENT_TABLE_START_COL + offset as u16,
                    value,
                )?;
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

pub fn sanitize_stem(stem: &str) -> String {
    NON_WORD_RE.replace_all(stem, "_").into_owned()
}

/// Date fragment used in export filenames.
pub fn date_for_filename() -> String {
    Utc::now().format("%d-%m-%Y").to_string()
}

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};

use crate::models::Post;
use crate::sequence::{alt_image_file_name, image_file_name};

pub const DELIMITER: &str = "---";

/// Render one post in the log's block layout, delimiter line included.
pub fn format_post_block(post: &Post) -> String {
    format!(
        "title: {title}\n\
         images: {image},{alt}\n\
         fontSize: {font_size}\n\
         date: {date}\n\
         content: {content}<p>原始連結：<a href=\"{link}\" target=\"_blank\">{link}</a></p>\n\
         {DELIMITER}\n",
        title = post.title,
        image = image_file_name(post.image_id),
        alt = alt_image_file_name(post.image_id),
        font_size = post.font_size,
        date = post.date.format("%Y-%m-%d"),
        content = post.content_html,
        link = post.link,
    )
}

pub struct Publisher {
    log_file: PathBuf,
    image_dir: PathBuf,
}

impl Publisher {
    pub fn new(log_file: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Publisher {
            log_file: log_file.into(),
            image_dir: image_dir.into(),
        }
    }

    /// Save the image (when there is one) and put the post at the top of the log.
    pub fn publish(&self, post: &Post, image: Option<&[u8]>) -> Result<()> {
        match image {
            Some(bytes) => {
                let path = self.save_image(post.image_id, bytes)?;
                info!("Image saved to {}", path.display());
            }
            None => warn!(
                "No image for post {}, recording {} without a file",
                post.image_id,
                image_file_name(post.image_id)
            ),
        }

        self.prepend(&format_post_block(post))?;
        info!("Post {} written to {}", post.image_id, self.log_file.display());
        Ok(())
    }

    fn save_image(&self, id: u64, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.image_dir)
            .with_context(|| format!("Failed to create {}", self.image_dir.display()))?;
        let path = self.image_dir.join(image_file_name(id));
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    fn prepend(&self, block: &str) -> Result<()> {
        let existing = match fs::read_to_string(&self.log_file) {
            Ok(existing) => existing,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.log_file.display()));
            }
        };

        create_parent(&self.log_file)?;
        fs::write(&self.log_file, format!("{block}{existing}"))
            .with_context(|| format!("Failed to write {}", self.log_file.display()))
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Ok(())
}

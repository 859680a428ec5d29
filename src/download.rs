//! Corpus download and extraction.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use futures::StreamExt;
use log::{debug, info};
use reqwest::Url;

use crate::error::Error;

pub const WIKIDATA5M_URL: &str =
    "https://huggingface.co/datasets/intfloat/wikidata5m/resolve/main/wikidata5m_inductive.tar.gz";

/// Training split of the archive, the default sampling corpus.
pub const WIKIDATA5M_TRAIN: &str = "wikidata5m_inductive_train.txt";

pub struct Download<'a> {
    src: Url,
    client: &'a reqwest::Client,
}

impl<'a> Download<'a> {
    pub fn new(src: &str, client: &'a reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            src: Url::parse(src)?,
            client,
        })
    }

    /// Last path segment of the source url.
    pub fn file_name(&self) -> Option<&str> {
        self.src
            .path_segments()?
            .last()
            .filter(|name| !name.is_empty())
    }

    /// Stream the body into `dst`. Returns the number of bytes written.
    pub async fn save_to(&self, dst: &Path) -> Result<u64, Error> {
        info!("downloading {} to {:?}", self.src, dst);
        let mut stream = self
            .client
            .get(self.src.clone())
            .send()
            .await?
            .error_for_status()?
            .bytes_stream();

        let mut file = BufWriter::new(File::create(dst)?);
        let mut written = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        file.flush()?;
        debug!("{} bytes written", written);
        Ok(written)
    }
}

/// Extract a `.tar.gz` archive into `dst`.
pub fn extract(archive: &Path, dst: &Path) -> Result<(), Error> {
    info!("extracting {:?} into {:?}", archive, dst);
    let gz = GzDecoder::new(BufReader::new(File::open(archive)?));
    tar::Archive::new(gz).unpack(dst)?;
    Ok(())
}

/// Download the archive at `url` into `dst` and extract it there. Returns the archive path.
pub async fn fetch(url: &str, dst: &Path) -> Result<PathBuf, Error> {
    let client = reqwest::Client::new();
    let download = Download::new(url, &client)?;
    let archive = dst.join(download.file_name().unwrap_or("archive.tar.gz"));

    std::fs::create_dir_all(dst)?;
    download.save_to(&archive).await?;
    extract(&archive, dst)?;
    Ok(archive)
}

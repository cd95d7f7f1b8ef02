use axum::body::{Body, Bytes};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::args::OutputMode;

pub const FIXED_OUTPUT_NAME: &str = "output.wav";
const READ_CHUNK: usize = 64 * 1024;

/// Turns an encoded WAV into the `/audio` response using the configured mode.
pub async fn deliver(wav: Vec<u8>, mode: OutputMode, dir: &Path) -> anyhow::Result<Response> {
    let (body, len) = match mode {
        OutputMode::Memory => {
            let len = wav.len() as u64;
            (Body::from(wav), len)
        }
        OutputMode::TempFile => {
            let file = write_temp_file(wav, dir.to_path_buf()).await?;
            let len = file.metadata().await?.len();
            (file_body(file), len)
        }
        OutputMode::FixedPath => {
            let path = dir.join(FIXED_OUTPUT_NAME);
            tokio::fs::write(&path, &wav).await?;
            info!("Overwrote {}", path.display());
            open_shared_slot(&path).await?
        }
    };
    Ok(wav_response(body, len))
}

/// Opens the shared output file and sizes the response from the handle, not
/// from what this request wrote: another request may have replaced the file
/// in between.
async fn open_shared_slot(path: &Path) -> anyhow::Result<(Body, u64)> {
    let file = tokio::fs::File::open(path).await?;
    let len = file.metadata().await?.len();
    Ok((file_body(file), len))
}

/// Writes `wav` to a fresh temp file and returns an open handle to it. The
/// directory entry is removed before returning, so the data lives only as
/// long as the handle.
async fn write_temp_file(wav: Vec<u8>, dir: PathBuf) -> anyhow::Result<tokio::fs::File> {
    let file = tokio::task::spawn_blocking(move || -> anyhow::Result<std::fs::File> {
        let mut tmp = tempfile::Builder::new()
            .prefix("voicebox-")
            .suffix(".wav")
            .tempfile_in(&dir)?;
        tmp.write_all(&wav)?;
        tmp.flush()?;
        info!("Temp file written: {}", tmp.path().display());
        let reader = tmp.reopen()?;
        tmp.close()?;
        Ok(reader)
    })
    .await??;
    Ok(tokio::fs::File::from_std(file))
}

fn file_body(file: tokio::fs::File) -> Body {
    let chunks = futures_util::stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = file.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok::<_, std::io::Error>(Some((Bytes::from(buf), file)))
    });
    Body::from_stream(chunks)
}

fn wav_response(body: Body, len: u64) -> Response {
    let mut res = Response::new(body);
    *res.status_mut() = StatusCode::OK;
    let headers = res.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"audio.wav\""),
    );
    res
}

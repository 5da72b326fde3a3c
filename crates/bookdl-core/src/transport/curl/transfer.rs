//! One blocking libcurl transfer into a partial file.

use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::classify::classify_curl_error;
use super::headers::{parse_response_headers, ResponseHeaders};
use super::resume::CurlResumeData;
use super::CurlOptions;
use crate::destination::{filename_from_url_path, parse_content_disposition_filename};
use crate::record::DownloadRequest;
use crate::transport::{TransportError, TransportSink};

pub(super) struct TransferJob {
    pub request: DownloadRequest,
    pub partial_path: PathBuf,
    /// Bytes already on disk; non-zero means a Range request.
    pub offset: u64,
    pub abort: Arc<AtomicBool>,
    pub options: CurlOptions,
    pub sink: TransportSink,
}

/// Mutable state shared by the header/write callbacks.
struct Body {
    file: File,
    /// Absolute bytes on disk (offset included).
    written: u64,
    expected: Option<u64>,
    /// Set once the first body chunk has checked the final response.
    started: bool,
    /// The server answered a Range request with neither 206 nor 200.
    refused: bool,
    last_report: Instant,
    write_error: Option<io::Error>,
}

/// Runs the transfer to its end and reports exactly one terminal event.
pub(super) fn run(job: TransferJob) {
    let file = match open_partial(&job) {
        Ok(f) => f,
        Err(e) => {
            job.sink.failed(TransportError::other(
                e.raw_os_error().unwrap_or(-1),
                format!("open {}: {e}", job.partial_path.display()),
            ));
            return;
        }
    };

    let header_lines = RefCell::new(Vec::<String>::new());
    let body = RefCell::new(Body {
        file,
        written: job.offset,
        expected: None,
        started: false,
        refused: false,
        last_report: Instant::now(),
        write_error: None,
    });

    let mut easy = curl::easy::Easy::new();
    let result = configure(&mut easy, &job).and_then(|()| {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(line) = std::str::from_utf8(data) {
                header_lines.borrow_mut().push(line.trim_end().to_string());
            }
            true
        })?;
        transfer.write_function(|data| {
            if job.abort.load(Ordering::Relaxed) {
                return Ok(0);
            }
            let mut body = body.borrow_mut();
            if !body.started {
                let headers = parse_response_headers(&header_lines.borrow());
                if let Err(e) = begin_body(&mut body, &headers, job.offset) {
                    body.write_error = Some(e);
                    return Ok(0);
                }
            }
            if body.refused {
                return Ok(0);
            }
            if let Err(e) = body.file.write_all(data) {
                body.write_error = Some(e);
                return Ok(0);
            }
            body.written += data.len() as u64;
            if body.last_report.elapsed() >= job.options.progress_interval {
                body.last_report = Instant::now();
                job.sink.progress(body.written, body.expected);
            }
            Ok(data.len())
        })?;
        transfer.progress_function(|_, _, _, _| !job.abort.load(Ordering::Relaxed))?;
        transfer.perform()
    });

    let mut body = body.into_inner();
    let flushed = body.file.flush().and_then(|()| body.file.sync_data());
    let headers = parse_response_headers(&header_lines.into_inner());
    let status = easy
        .response_code()
        .ok()
        .and_then(|code| u16::try_from(code).ok())
        .or(headers.status)
        .unwrap_or(0);

    if job.abort.load(Ordering::Relaxed) && result.is_err() {
        let resume = CurlResumeData {
            request: job.request.clone(),
            partial_path: job.partial_path.clone(),
            offset: body.written,
        };
        tracing::debug!(task = %job.sink.task(), offset = body.written, "curl transfer cancelled");
        job.sink.cancelled(Some(resume.to_bytes()));
        return;
    }

    // An error page must not replace the bytes a resume depends on.
    let refused =
        body.refused || (result.is_ok() && job.offset > 0 && !matches!(status, 200 | 206));
    if refused {
        tracing::debug!(
            task = %job.sink.task(),
            status,
            offset = job.offset,
            "Range request refused; partial file kept"
        );
        job.sink.failed(TransportError::server(
            status,
            format!("resume refused with HTTP {status}"),
        ));
        return;
    }

    if let Some(e) = body.write_error.take() {
        job.sink.failed(TransportError::other(
            e.raw_os_error().unwrap_or(-1),
            format!("write {}: {e}", job.partial_path.display()),
        ));
        return;
    }

    if let Err(e) = result {
        tracing::debug!(task = %job.sink.task(), "curl transfer failed: {}", e);
        job.sink.failed(classify_curl_error(&e));
        return;
    }

    if let Err(e) = flushed {
        job.sink.failed(TransportError::other(
            e.raw_os_error().unwrap_or(-1),
            format!("sync {}: {e}", job.partial_path.display()),
        ));
        return;
    }

    // A full response with an empty body never reached `begin_body`.
    if job.offset > 0 && status == 200 && !body.started {
        if let Err(e) = body.file.set_len(0) {
            job.sink.failed(TransportError::other(
                e.raw_os_error().unwrap_or(-1),
                format!("truncate {}: {e}", job.partial_path.display()),
            ));
            return;
        }
        body.written = 0;
    }

    let suggested_name = headers
        .content_disposition
        .as_deref()
        .and_then(parse_content_disposition_filename)
        .or_else(|| {
            easy.effective_url()
                .ok()
                .flatten()
                .and_then(filename_from_url_path)
        });

    job.sink
        .progress(body.written, body.expected.or(Some(body.written)));
    job.sink
        .completed(job.partial_path.clone(), status, suggested_name);
}

fn open_partial(job: &TransferJob) -> io::Result<File> {
    if job.offset == 0 {
        return File::create(&job.partial_path);
    }
    let mut file = OpenOptions::new().write(true).open(&job.partial_path)?;
    file.set_len(job.offset)?;
    file.seek(SeekFrom::Start(job.offset))?;
    Ok(file)
}

/// First body chunk. For a Range request 206 continues, 200 starts over
/// and anything else is refused before a byte is written.
fn begin_body(body: &mut Body, headers: &ResponseHeaders, offset: u64) -> io::Result<()> {
    body.started = true;
    if offset == 0 {
        body.expected = headers.expected_total(0);
        return Ok(());
    }
    match headers.status {
        Some(206) => body.expected = headers.expected_total(offset),
        Some(200) => {
            tracing::debug!("server ignored Range request; restarting from zero");
            body.file.set_len(0)?;
            body.file.seek(SeekFrom::Start(0))?;
            body.written = 0;
            body.expected = headers.expected_total(0);
        }
        _ => body.refused = true,
    }
    Ok(())
}

fn configure(easy: &mut curl::easy::Easy, job: &TransferJob) -> Result<(), curl::Error> {
    let opts = &job.options;
    easy.url(&job.request.url)?;
    if !job.request.method.eq_ignore_ascii_case("GET") {
        easy.custom_request(&job.request.method)?;
    }
    easy.follow_location(true)?;
    easy.max_redirections(opts.max_redirections)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    easy.progress(true)?;
    if let Some(agent) = &opts.user_agent {
        easy.useragent(agent)?;
    }

    let mut list = curl::easy::List::new();
    for (name, value) in &job.request.headers {
        list.append(&format!("{}: {}", name.trim(), value.trim()))?;
    }
    if job.offset > 0 {
        list.append(&format!("Range: bytes={}-", job.offset))?;
    }
    easy.http_headers(list)?;
    Ok(())
}

use std::path::Path;

use base64::Engine as _;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONNECTION, HeaderName, HeaderValue};
use http::Method;
use tracing::debug;
use url::Url;

use crate::error::{AppError, AppResult, TemplateError};

use super::template::RequestTemplate;

const SUPPORTED_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub keep_alive: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { keep_alive: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Preamble,
    RequestLine,
    Headers,
    Body,
    ResponseHandler,
}

#[derive(Debug, Default)]
struct Draft {
    name: Option<String>,
    tags: Vec<String>,
    method: Option<Method>,
    url: String,
    headers: Vec<(String, String)>,
    body: String,
}

/// Read and parse a `.http` request file.
///
/// # Errors
///
/// Returns an error when the file cannot be read, a request is malformed, or
/// the file contains no requests at all.
pub fn load_templates(path: &Path, options: ParseOptions) -> AppResult<Vec<RequestTemplate>> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        AppError::template(TemplateError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
    })?;
    let templates = parse_templates(&content, options)?;
    if templates.is_empty() {
        return Err(AppError::template(TemplateError::NoRequests {
            path: path.to_path_buf(),
        }));
    }
    debug!(
        "Loaded {} request template(s) from {}",
        templates.len(),
        path.display()
    );
    Ok(templates)
}

/// Parse `.http` text into templates. An input without requests yields an
/// empty list.
///
/// # Errors
///
/// Returns an error for invalid URLs, headers, or request methods.
pub fn parse_templates(
    content: &str,
    options: ParseOptions,
) -> Result<Vec<RequestTemplate>, TemplateError> {
    let mut templates = Vec::new();
    let mut draft = Draft::default();
    let mut part = Part::Preamble;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("###") {
            finish(&mut templates, &mut draft, options)?;
            part = Part::Preamble;
            continue;
        }

        if part == Part::RequestLine {
            if line.starts_with([' ', '\t']) && !trimmed.is_empty() {
                draft.url.push_str(trimmed);
                continue;
            }
            part = Part::Headers;
        }

        match part {
            Part::Preamble => {
                if parse_preamble(&mut draft, line, templates.len().saturating_add(1))? {
                    part = Part::RequestLine;
                }
            }
            Part::RequestLine | Part::Headers => {
                if trimmed.is_empty() {
                    part = Part::Body;
                } else if !is_comment(trimmed) {
                    let (name, value) = trimmed.split_once(':').ok_or_else(|| {
                        TemplateError::InvalidHeader {
                            index: templates.len().saturating_add(1),
                            name: trimmed.to_owned(),
                        }
                    })?;
                    draft
                        .headers
                        .push((name.trim().to_owned(), value.trim().to_owned()));
                }
            }
            Part::Body => {
                if line.starts_with("> {%") {
                    part = Part::ResponseHandler;
                } else if !trimmed.is_empty() {
                    draft.body.push_str(line);
                    draft.body.push('\n');
                }
            }
            Part::ResponseHandler => {}
        }
    }
    finish(&mut templates, &mut draft, options)?;

    Ok(templates)
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with("//")
}

/// Returns `true` once a request line has been consumed.
fn parse_preamble(draft: &mut Draft, line: &str, index: usize) -> Result<bool, TemplateError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }
    if is_comment(trimmed) {
        let annotation = trimmed.trim_start_matches(['#', '/']).trim_start();
        if let Some(name) = annotation.strip_prefix("@Name") {
            draft.name = Some(name.trim().to_owned());
        } else if let Some(tags) = annotation.strip_prefix("@Tags") {
            draft.tags = tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_owned)
                .collect();
        }
        return Ok(false);
    }

    let request_line = strip_inline_comment(trimmed);
    let mut tokens = request_line.split_whitespace();
    let (Some(verb), Some(target)) = (tokens.next(), tokens.next()) else {
        return Ok(false);
    };
    if SUPPORTED_METHODS.contains(&verb) {
        let method = Method::from_bytes(verb.as_bytes()).map_err(|_| {
            TemplateError::UnsupportedMethod {
                index,
                method: verb.to_owned(),
            }
        })?;
        draft.method = Some(method);
        draft.url = target.to_owned();
        return Ok(true);
    }
    if verb.chars().all(|ch| ch.is_ascii_uppercase()) && target.contains("://") {
        return Err(TemplateError::UnsupportedMethod {
            index,
            method: verb.to_owned(),
        });
    }
    Ok(false)
}

fn strip_inline_comment(line: &str) -> &str {
    let cut = [" #", " //"]
        .iter()
        .filter_map(|marker| line.find(marker))
        .min()
        .unwrap_or(line.len());
    line.get(..cut).unwrap_or(line).trim_end()
}

fn finish(
    templates: &mut Vec<RequestTemplate>,
    draft: &mut Draft,
    options: ParseOptions,
) -> Result<(), TemplateError> {
    let draft = std::mem::take(draft);
    let Some(method) = draft.method else {
        return Ok(());
    };
    let index = templates.len().saturating_add(1);
    let url = Url::parse(&draft.url).map_err(|source| TemplateError::InvalidUrl {
        index,
        url: draft.url.clone(),
        source,
    })?;

    let mut template = RequestTemplate::new(method, url);
    template.name = draft.name;
    template.tags = draft.tags;
    template.body = Bytes::from(draft.body);

    for (name, value) in draft.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            TemplateError::InvalidHeader {
                index,
                name: name.clone(),
            }
        })?;
        let value = if header_name == AUTHORIZATION {
            encode_basic_auth(&value)
        } else {
            value
        };
        let header_value =
            HeaderValue::from_str(&value).map_err(|_| TemplateError::InvalidHeader {
                index,
                name: name.clone(),
            })?;
        template.headers.insert(header_name, header_value);
    }
    if options.keep_alive {
        template
            .headers
            .insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    }

    templates.push(template);
    Ok(())
}

/// `Basic user pass` becomes `Basic base64(user:pass)`; a single token is
/// assumed to be encoded already.
pub(crate) fn encode_basic_auth(value: &str) -> String {
    let Some(credentials) = value.strip_prefix("Basic") else {
        return value.to_owned();
    };
    let parts: Vec<&str> = credentials.split_whitespace().collect();
    match parts.as_slice() {
        [user, pass] => {
            let token = format!("{}:{}", user, pass);
            format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(token.as_bytes())
            )
        }
        [encoded, ..] => format!("Basic {}", encoded),
        [] => value.to_owned(),
    }
}

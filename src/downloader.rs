use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PatchError;
use crate::progress::ProgressSink;

const DRIVE_DOWNLOAD_URL: &str = "https://drive.google.com/uc";
const USER_AGENT: &str = "higu-patcher/1.2";

/// Download a patch archive from Google Drive into `destination`.
///
/// The transfer is streamed to disk, so archive size is not bounded by
/// memory. Progress is coarse: one status before the transfer, and a
/// descriptive failure status before the error propagates.
pub fn fetch_drive_file(
    client: &reqwest::blocking::Client,
    file_id: &str,
    destination: &Path,
    sink: &dyn ProgressSink,
) -> Result<(), PatchError> {
    sink.status("구글 드라이브에서 패치 파일을 가져오는 중이에요. 조금만 기다려 주세요.");
    log::info!("Downloading drive file {file_id} to {}", destination.display());

    match fetch_inner(client, file_id, destination) {
        Ok(()) => Ok(()),
        Err(message) => {
            sink.status(&format!("다운로드 중에 문제가 생겼어요: {message}"));
            Err(PatchError::fetch(file_id, message))
        }
    }
}

fn fetch_inner(
    client: &reqwest::blocking::Client,
    file_id: &str,
    destination: &Path,
) -> Result<(), String> {
    let response = client
        .get(DRIVE_DOWNLOAD_URL)
        .query(&[("export", "download"), ("id", file_id)])
        .header("User-Agent", USER_AGENT)
        .send()
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    stream_to_file(response, destination)?;
    if is_zip_file(destination)? {
        return Ok(());
    }

    // Files above the virus-scan size limit get an HTML interstitial with a
    // "download anyway" form instead of the bytes; replay that form.
    let html = std::fs::read_to_string(destination).map_err(|e| e.to_string())?;
    let form = parse_confirm_form(&html)
        .ok_or_else(|| "drive response was not a zip and carried no download form".to_string())?;

    log::info!("Drive returned a confirmation page; retrying via {}", form.action);

    let response = client
        .get(&form.action)
        .query(&form.params)
        .header("User-Agent", USER_AGENT)
        .send()
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    stream_to_file(response, destination)?;
    if !is_zip_file(destination)? {
        return Err("downloaded file is not a valid zip (got non-zip response)".to_string());
    }
    Ok(())
}

fn stream_to_file(mut response: reqwest::blocking::Response, path: &Path) -> Result<u64, String> {
    let mut file = File::create(path).map_err(|e| e.to_string())?;
    std::io::copy(&mut response, &mut file).map_err(|e| e.to_string())
}

/// ZIP files start with "PK"; anything else here is an error page.
fn is_zip_file(path: &Path) -> Result<bool, String> {
    let mut f = File::open(path).map_err(|e| e.to_string())?;
    let mut header = [0u8; 2];
    let n = f.read(&mut header).map_err(|e| e.to_string())?;
    Ok(n == 2 && header == *b"PK")
}

#[derive(Debug, PartialEq)]
struct ConfirmForm {
    action: String,
    params: Vec<(String, String)>,
}

/// Pull the action URL and hidden fields out of Drive's confirmation page.
fn parse_confirm_form(html: &str) -> Option<ConfirmForm> {
    let form_start = html.find("<form")?;
    let form_end = html[form_start..].find("</form>")? + form_start;
    let form = &html[form_start..form_end];

    let action = attr_value(form, "action")?;

    let mut params = vec![];
    let mut rest = form;
    while let Some(i) = rest.find("<input") {
        let tag_end = rest[i..].find('>')? + i;
        let tag = &rest[i..tag_end];
        if let (Some(name), Some(value)) = (attr_value(tag, "name"), attr_value(tag, "value")) {
            params.push((name, value));
        }
        rest = &rest[tag_end..];
    }

    Some(ConfirmForm { action, params })
}

fn attr_value(tag: &str, attr: &str) -> Option<String> {
    let needle = format!("{attr}=\"");
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')? + start;
    Some(html_unescape(&tag[start..end]))
}

fn html_unescape(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIRM_PAGE: &str = r#"<!DOCTYPE html><html><head><title>Google Drive - Virus scan warning</title></head>
<body><form id="download-form" action="https://drive.usercontent.google.com/download" method="get">
<input type="submit" id="uc-download-link" value="Download anyway" />
<input type="hidden" name="id" value="1J2FmtLdf72iU0M8PY7WE6L_DVU2ziw3S">
<input type="hidden" name="export" value="download">
<input type="hidden" name="confirm" value="t">
<input type="hidden" name="uuid" value="9f2c6f14-13da-4b6e-9e0e-111111111111">
</form></body></html>"#;

    #[test]
    fn parses_drive_confirm_form() {
        let form = parse_confirm_form(CONFIRM_PAGE).unwrap();
        assert_eq!(form.action, "https://drive.usercontent.google.com/download");
        assert_eq!(
            form.params,
            vec![
                ("id".to_string(), "1J2FmtLdf72iU0M8PY7WE6L_DVU2ziw3S".to_string()),
                ("export".to_string(), "download".to_string()),
                ("confirm".to_string(), "t".to_string()),
                (
                    "uuid".to_string(),
                    "9f2c6f14-13da-4b6e-9e0e-111111111111".to_string()
                ),
            ]
        );
    }

    #[test]
    fn confirm_form_unescapes_action_url() {
        let html = r#"<form action="https://drive.usercontent.google.com/download?id=x&amp;export=download"><input name="confirm" value="t"></form>"#;
        let form = parse_confirm_form(html).unwrap();
        assert_eq!(
            form.action,
            "https://drive.usercontent.google.com/download?id=x&export=download"
        );
    }

    #[test]
    fn page_without_form_is_rejected() {
        assert_eq!(parse_confirm_form("<html><body>quota exceeded</body></html>"), None);
    }

    #[test]
    fn zip_magic_check() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.zip");
        std::fs::write(&good, b"PK\x03\x04rest-of-archive").unwrap();
        assert!(is_zip_file(&good).unwrap());

        let bad = dir.path().join("bad.zip");
        std::fs::write(&bad, b"<html>error page</html>").unwrap();
        assert!(!is_zip_file(&bad).unwrap());

        let empty = dir.path().join("empty.zip");
        std::fs::write(&empty, b"").unwrap();
        assert!(!is_zip_file(&empty).unwrap());
    }
}

//! Upload CLI
//!
//! Posts one file as multipart/form-data and prints the server's response.

use bytesize::ByteSize;
use clap::{Arg, ArgAction, Command};
use std::io::Write;
use upload_request::{
    HttpTransportConfig, UploadClient, UploadConfig, UploadError, UploadFile, UploadProgress,
    UploadResponse,
};

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

fn print_progress(progress: UploadProgress) {
    eprint!(
        "\rUploaded {} of {} ({:.1}%)",
        ByteSize::b(progress.loaded),
        ByteSize::b(progress.total),
        progress.percent
    );
    if progress.is_complete() {
        eprintln!();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("upload")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Upload a file as multipart/form-data")
        .arg(
            Arg::new("url")
                .long("url")
                .help("Destination endpoint")
                .required(true),
        )
        .arg(
            Arg::new("file")
                .long("file")
                .help("Path of the file to upload")
                .required(true),
        )
        .arg(
            Arg::new("field")
                .long("field")
                .help("Form field name of the file part")
                .default_value("file"),
        )
        .arg(
            Arg::new("mime")
                .long("mime")
                .help("Content type of the file part (default: application/octet-stream)"),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .help("Extra form field as key=value, repeatable")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON file with transport settings"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Whole-request timeout in seconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .help("Bytes sent per progress report")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut transport_config = match matches.get_one::<String>("config") {
        Some(path) => HttpTransportConfig::from_json_file(path)?,
        None => HttpTransportConfig::default(),
    };
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        transport_config = transport_config.timeout(*timeout);
    }
    if let Some(chunk_size) = matches.get_one::<usize>("chunk-size") {
        transport_config = transport_config.chunk_size(*chunk_size);
    }

    let url = matches
        .get_one::<String>("url")
        .ok_or("missing --url")?;
    let path = matches
        .get_one::<String>("file")
        .ok_or("missing --file")?;
    let field = matches
        .get_one::<String>("field")
        .ok_or("missing --field")?;

    let mut file = UploadFile::from_path(path)?;
    if let Some(mime) = matches.get_one::<String>("mime") {
        file = file.mime_type(mime.clone());
    }

    let fields = matches
        .get_many::<String>("data")
        .into_iter()
        .flatten()
        .map(|raw| parse_field(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let config = UploadConfig::new(url.clone(), field.clone(), file)
        .fields(fields)
        .on_progress(print_progress);

    let client = UploadClient::with_config(transport_config)?;
    match client.upload(config).await {
        Ok(UploadResponse::Parsed(value)) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Ok(UploadResponse::Raw(text)) => {
            println!("{}", text);
        }
        Ok(UploadResponse::Passthrough(bytes)) => {
            std::io::stdout().write_all(&bytes)?;
        }
        Err(UploadError::Http { status, body }) => {
            eprintln!("Server responded with status {}", status);
            if let Some(body) = body {
                eprintln!("{}", body);
            }
            return Err(UploadError::http(status, None).into());
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field() {
        assert_eq!(
            parse_field("user=alice").unwrap(),
            ("user".to_string(), "alice".to_string())
        );
        assert_eq!(
            parse_field("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_field("empty=").unwrap(),
            ("empty".to_string(), String::new())
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=value").is_err());
    }
}

//! Reading and writing of YAML and JSON documents.
use std::{
    fs::File,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use snafu::{ResultExt, Snafu};

/// The path which selects stdin as input.
pub const STDIN: &str = "-";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to open {path:?}"))]
    OpenFile { source: io::Error, path: PathBuf },

    #[snafu(display("failed to parse document"))]
    ParseDocument { source: serde_yaml::Error },

    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to serialize JSON"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("failed to write document"))]
    WriteDocument { source: io::Error },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Reads a YAML or JSON document from `path`, or from stdin if `path` is
/// [`STDIN`].
pub fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader: Box<dyn Read> = if path == Path::new(STDIN) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(path).context(OpenFileSnafu { path })?)
    };

    serde_yaml::from_reader(reader).context(ParseDocumentSnafu)
}

/// Writes `value` as a single document. YAML documents are written with an
/// explicit `---` document separator.
pub fn write<T, W>(mut writer: W, value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize,
    W: Write,
{
    match format {
        OutputFormat::Yaml => {
            writer.write_all(b"---\n").context(WriteDocumentSnafu)?;
            serde_yaml::to_writer(&mut writer, value).context(SerializeYamlSnafu)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, value).context(SerializeJsonSnafu)?;
            writer.write_all(b"\n").context(WriteDocumentSnafu)?;
        }
    }

    writer.flush().context(WriteDocumentSnafu)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;

    #[rstest]
    #[case("address_type: IPv4\nport:\n  - port: 80\n")]
    #[case(r#"{"address_type": "IPv4", "port": [{"port": 80}]}"#)]
    fn read_yaml_and_json(#[case] content: &str) {
        let mut file = tempfile::NamedTempFile::new().expect("temporary file must be created");
        file.write_all(content.as_bytes())
            .expect("temporary file must be writable");

        let document: Value = read(file.path()).expect("document must parse");

        assert_eq!(
            document,
            json!({"address_type": "IPv4", "port": [{"port": 80}]})
        );
    }

    #[test]
    fn read_missing_file() {
        let result: Result<Value> = read(Path::new("/does/not/exist.yaml"));
        assert!(matches!(result, Err(Error::OpenFile { .. })));
    }

    #[rstest]
    #[case(OutputFormat::Yaml, "---\naddress_type: IPv4\n")]
    #[case(OutputFormat::Json, "{\n  \"address_type\": \"IPv4\"\n}\n")]
    fn write_document(#[case] format: OutputFormat, #[case] expected: &str) {
        let mut buf = Vec::new();
        write(&mut buf, &json!({"address_type": "IPv4"}), format).expect("document must serialize");

        let actual = std::str::from_utf8(&buf).expect("output must be valid UTF-8");
        assert_eq!(actual, expected);
    }
}

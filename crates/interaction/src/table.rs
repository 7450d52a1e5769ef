use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::config::{InteractableConfig, InteractionType, TraceChannel};
use crate::key::KeyRef;

const ROOT_ELEMENT: &str = "InteractableTable";
const ROW_ELEMENT: &str = "Row";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownElement,
    UnknownField,
    DuplicateField,
    DuplicateRow,
    MissingRowName,
    InvalidValue,
}

#[derive(Debug, Clone)]
pub struct TableError {
    pub code: TableErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for TableError {}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigTable {
    rows: BTreeMap<String, InteractableConfig>,
}

impl ConfigTable {
    pub fn from_rows(rows: impl IntoIterator<Item = (String, InteractableConfig)>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, TableError> {
        let raw = fs::read_to_string(path).map_err(|source| TableError {
            code: TableErrorCode::ReadFile,
            message: format!("failed to read table file: {source}"),
            file_path: path.to_path_buf(),
            location: None,
        })?;
        Self::parse(path, &raw)
    }

    pub fn parse(file_path: &Path, raw: &str) -> Result<Self, TableError> {
        let doc = Document::parse(raw).map_err(|error| TableError {
            code: TableErrorCode::XmlMalformed,
            message: format!("malformed XML: {error}"),
            file_path: file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: error.pos().row as usize,
                column: error.pos().col as usize,
            }),
        })?;
        let parser = RowParser {
            file_path,
            doc: &doc,
        };

        let root = doc.root_element();
        if root.tag_name().name() != ROOT_ELEMENT {
            return Err(parser.error_at(
                TableErrorCode::InvalidRoot,
                format!("root element must be <{ROOT_ELEMENT}>"),
                root,
            ));
        }

        let mut rows = BTreeMap::new();
        for child in root.children().filter(|node| node.is_element()) {
            if child.tag_name().name() != ROW_ELEMENT {
                return Err(parser.error_at(
                    TableErrorCode::UnknownElement,
                    format!(
                        "unsupported element <{}>; tables contain only <{ROW_ELEMENT}>",
                        child.tag_name().name()
                    ),
                    child,
                ));
            }
            let (name, config) = parser.parse_row(child)?;
            if rows.contains_key(&name) {
                return Err(parser.error_at(
                    TableErrorCode::DuplicateRow,
                    format!("duplicate row '{name}'; each row name may appear once"),
                    child,
                ));
            }
            rows.insert(name, config);
        }

        Ok(Self { rows })
    }

    pub fn find_row(&self, name: &str) -> Option<&InteractableConfig> {
        self.rows.get(name)
    }

    pub fn row_names(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct RowParser<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl RowParser<'_, '_> {
    fn parse_row(&self, node: Node<'_, '_>) -> Result<(String, InteractableConfig), TableError> {
        let name = node
            .attribute("name")
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                self.error_at(
                    TableErrorCode::MissingRowName,
                    format!("<{ROW_ELEMENT}> requires a non-empty name attribute"),
                    node,
                )
            })?
            .to_string();

        let mut config = InteractableConfig::default();
        let mut seen_fields = HashSet::<String>::new();
        for field in node.children().filter(|child| child.is_element()) {
            let field_name = field.tag_name().name().to_string();
            if !seen_fields.insert(field_name.clone()) {
                return Err(self.error_at(
                    TableErrorCode::DuplicateField,
                    format!("duplicate field <{field_name}> in row '{name}'"),
                    field,
                ));
            }

            match field_name.as_str() {
                "display_text" => config.display_text = self.text(field),
                "tooltip_text" => config.tooltip_text = self.text(field),
                "max_hover_distance_from_agent" => {
                    config.max_hover_distance_from_agent = self.non_negative(field)?;
                }
                "max_hover_distance_from_view_center" => {
                    config.max_hover_distance_from_view_center = self.non_negative(field)?;
                }
                "max_overlap_distance" => {
                    config.max_overlap_distance = self.non_negative(field)?;
                }
                "detect_when_obstructed" => config.detect_when_obstructed = self.flag(field)?,
                "allow_interaction_when_obstructed" => {
                    config.allow_interaction_when_obstructed = self.flag(field)?;
                }
                "obstruction_channel" => {
                    let value = self.required_text(field)?;
                    config.obstruction_channel =
                        TraceChannel::parse_token(&value).ok_or_else(|| {
                            self.error_at(
                                TableErrorCode::InvalidValue,
                                format!(
                                    "invalid channel '{value}'; allowed values: visibility, camera, custom<N>"
                                ),
                                field,
                            )
                        })?;
                }
                "interaction_key" => {
                    let value = self.required_text(field)?;
                    config.interaction_key = KeyRef::new(value.as_str()).map_err(|error| {
                        self.error_at(
                            TableErrorCode::InvalidValue,
                            format!("invalid interaction key '{value}': {error}"),
                            field,
                        )
                    })?;
                }
                "interaction_type" => {
                    let value = self.required_text(field)?;
                    config.interaction_type =
                        InteractionType::parse_token(&value).ok_or_else(|| {
                            self.error_at(
                                TableErrorCode::InvalidValue,
                                format!("invalid interaction type '{value}'; allowed values: press, hold"),
                                field,
                            )
                        })?;
                }
                "interaction_duration" => {
                    let value = self.number(field)?;
                    if value <= 0.0 {
                        return Err(self.error_at(
                            TableErrorCode::InvalidValue,
                            "interaction_duration must be > 0".to_string(),
                            field,
                        ));
                    }
                    config.interaction_duration = value;
                }
                "delay_between_interactions" => {
                    config.delay_between_interactions = self.non_negative(field)?;
                }
                _ => {
                    return Err(self.error_at(
                        TableErrorCode::UnknownField,
                        format!("unknown field <{field_name}> in row '{name}'"),
                        field,
                    ))
                }
            }
        }

        Ok((name, config))
    }

    fn text(&self, node: Node<'_, '_>) -> String {
        node.text().map(str::trim).unwrap_or_default().to_string()
    }

    fn required_text(&self, node: Node<'_, '_>) -> Result<String, TableError> {
        let value = self.text(node);
        if value.is_empty() {
            return Err(self.error_at(
                TableErrorCode::InvalidValue,
                format!("field <{}> must not be empty", node.tag_name().name()),
                node,
            ));
        }
        Ok(value)
    }

    fn number(&self, node: Node<'_, '_>) -> Result<f32, TableError> {
        let value = self.required_text(node)?;
        let parsed = value.parse::<f32>().map_err(|_| {
            self.error_at(
                TableErrorCode::InvalidValue,
                format!("{} '{value}' is not a valid number", node.tag_name().name()),
                node,
            )
        })?;
        if !parsed.is_finite() {
            return Err(self.error_at(
                TableErrorCode::InvalidValue,
                format!("{} must be finite", node.tag_name().name()),
                node,
            ));
        }
        Ok(parsed)
    }

    fn non_negative(&self, node: Node<'_, '_>) -> Result<f32, TableError> {
        let value = self.number(node)?;
        if value < 0.0 {
            return Err(self.error_at(
                TableErrorCode::InvalidValue,
                format!("{} must be >= 0", node.tag_name().name()),
                node,
            ));
        }
        Ok(value)
    }

    fn flag(&self, node: Node<'_, '_>) -> Result<bool, TableError> {
        let value = self.required_text(node)?;
        match value.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.error_at(
                TableErrorCode::InvalidValue,
                format!(
                    "{} '{value}' must be true or false",
                    node.tag_name().name()
                ),
                node,
            )),
        }
    }

    fn error_at(&self, code: TableErrorCode, message: String, node: Node<'_, '_>) -> TableError {
        let pos = self.doc.text_pos_at(node.range().start);
        TableError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn parse(raw: &str) -> Result<ConfigTable, TableError> {
        ConfigTable::parse(Path::new("table.xml"), raw)
    }

    #[test]
    fn parses_rows_and_keeps_defaults_for_missing_fields() {
        let table = parse(
            r#"<InteractableTable>
                <Row name="door">
                    <display_text>Open door</display_text>
                    <interaction_type>press</interaction_type>
                    <interaction_key>keys/use</interaction_key>
                    <obstruction_channel>custom2</obstruction_channel>
                </Row>
                <Row name="lever"><interaction_duration>2.5</interaction_duration></Row>
            </InteractableTable>"#,
        )
        .expect("table");

        assert_eq!(table.len(), 2);
        let door = table.find_row("door").expect("door");
        assert_eq!(door.display_text, "Open door");
        assert_eq!(door.interaction_type, InteractionType::Press);
        assert_eq!(door.interaction_key.path(), "keys/use");
        assert_eq!(door.obstruction_channel, TraceChannel::Custom(2));
        assert_eq!(door.tooltip_text, crate::config::PLACEHOLDER_TEXT);

        let lever = table.find_row("lever").expect("lever");
        assert_eq!(lever.interaction_duration, 2.5);
        assert!(table.find_row("missing").is_none());
    }

    #[test]
    fn duplicate_row_reports_location() {
        let err = parse(
            r#"<InteractableTable>
                <Row name="door"/>
                <Row name="door"/>
            </InteractableTable>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, TableErrorCode::DuplicateRow);
        assert_eq!(err.location.map(|loc| loc.line), Some(3));
    }

    #[test]
    fn unknown_field_errors() {
        let err = parse(r#"<InteractableTable><Row name="a"><mood>happy</mood></Row></InteractableTable>"#)
            .expect_err("err");
        assert_eq!(err.code, TableErrorCode::UnknownField);
    }

    #[test]
    fn duplicate_field_errors() {
        let err = parse(
            r#"<InteractableTable><Row name="a"><display_text>x</display_text><display_text>y</display_text></Row></InteractableTable>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, TableErrorCode::DuplicateField);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = parse(
            r#"<InteractableTable><Row name="a"><interaction_duration>0</interaction_duration></Row></InteractableTable>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, TableErrorCode::InvalidValue);
    }

    #[test]
    fn invalid_key_path_is_rejected() {
        let err = parse(
            r#"<InteractableTable><Row name="a"><interaction_key>../keys</interaction_key></Row></InteractableTable>"#,
        )
        .expect_err("err");
        assert_eq!(err.code, TableErrorCode::InvalidValue);
    }

    #[test]
    fn missing_row_name_errors() {
        let err = parse(r#"<InteractableTable><Row/></InteractableTable>"#).expect_err("err");
        assert_eq!(err.code, TableErrorCode::MissingRowName);
    }

    #[test]
    fn wrong_root_errors() {
        let err = parse(r#"<Defs/>"#).expect_err("err");
        assert_eq!(err.code, TableErrorCode::InvalidRoot);
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse(r#"<InteractableTable><Row name="a"></InteractableTable>"#).expect_err("err");
        assert_eq!(err.code, TableErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn load_reads_from_disk_and_reports_missing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("interactables.xml");
        fs::write(
            &path,
            r#"<InteractableTable><Row name="chest"><detect_when_obstructed>true</detect_when_obstructed></Row></InteractableTable>"#,
        )
        .expect("write");

        let table = ConfigTable::load(&path).expect("load");
        assert!(table.find_row("chest").expect("chest").detect_when_obstructed);

        let err = ConfigTable::load(&temp.path().join("missing.xml")).expect_err("err");
        assert_eq!(err.code, TableErrorCode::ReadFile);
        assert!(err.location.is_none());
    }
}

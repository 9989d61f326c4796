use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};

/// On-disk shape of a catalog, as found in `schemas/catalog.json`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CatalogSource {
    pub version: u32,
    pub default_base_url: String,
    pub root: String,
    #[serde(default)]
    pub globals: Vec<ParamSpec>,
    pub operations: Vec<OperationDef>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OperationDef {
    pub name: String,
    #[serde(default)]
    pub method: Method,
    pub path: String,
    #[serde(default)]
    pub response: ResponseShape,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    #[serde(rename = "GET")]
    Get,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    /// Four-digit year, optionally suffixed with PRE, REG or POST.
    Season,
    Enum,
}

/// JSON kind a successful response body must have.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    Array,
    Object,
    Boolean,
    #[default]
    Any,
}

impl ResponseShape {
    pub fn matches(&self, value: &serde_json::Value) -> bool {
        match self {
            ResponseShape::Array => value.is_array(),
            ResponseShape::Object => value.is_object(),
            ResponseShape::Boolean => value.is_boolean(),
            ResponseShape::Any => true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub location: ParamLocation,
    #[serde(default)]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed: Vec<String>,
}

impl ParamSpec {
    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name, ParamLocation::Path)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, ParamLocation::Query)
    }

    fn new(name: impl Into<String>, location: ParamLocation) -> Self {
        Self {
            name: name.into(),
            location,
            param_type: ParamType::String,
            required: false,
            default: None,
            allowed: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn of_type(mut self, param_type: ParamType) -> Self {
        self.param_type = param_type;
        self
    }

    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_type = ParamType::Enum;
        self.allowed = values.into_iter().map(Into::into).collect();
        self
    }

    /// Checks a value against this parameter's type.
    pub fn check(&self, value: &str) -> Result<()> {
        let reason = match self.param_type {
            ParamType::String if value.is_empty() => Some("must not be empty".to_string()),
            ParamType::String => None,
            ParamType::Season if !is_season(value) => {
                Some("expected a 4-digit year, optionally followed by PRE, REG or POST".to_string())
            }
            ParamType::Season => None,
            ParamType::Enum if !self.allowed.iter().any(|v| v == value) => {
                Some(format!("expected one of: {}", self.allowed.join("|")))
            }
            ParamType::Enum => None,
        };
        match reason {
            Some(reason) => Err(Error::InvalidParameterValue {
                name: self.name.clone(),
                value: value.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

fn is_season(value: &str) -> bool {
    let (Some(year), Some(suffix)) = (value.get(..4), value.get(4..)) else {
        return false;
    };
    year.bytes().all(|b| b.is_ascii_digit()) && matches!(suffix, "" | "PRE" | "REG" | "POST")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

fn validate_segment(segment: &Segment) -> std::result::Result<(), String> {
    match segment {
        Segment::Literal(v) if v.is_empty() => Err("empty segment".to_string()),
        Segment::Literal(v) if v.contains(['{', '}']) => Err(format!("unbalanced braces in {v}")),
        Segment::Literal(v) if v.contains(['/', '?', '#', '&']) => {
            Err(format!("reserved character in segment {v}"))
        }
        Segment::Param(name)
            if name.is_empty() || name.contains(['{', '}', '/', '?', '#', '&']) =>
        {
            Err(format!("bad placeholder {{{name}}}"))
        }
        Segment::Literal(_) | Segment::Param(_) => Ok(()),
    }
}

/// Ordered list of literal segments and `{Name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn parse(template: &str) -> Result<Self> {
        let trimmed = template.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        let mut segments = Vec::new();
        for raw in trimmed.split('/') {
            if raw.is_empty() {
                return Err(Error::InvalidCatalog(format!(
                    "empty segment in path template {template}"
                )));
            }
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(raw.to_string()),
            };
            validate_segment(&segment).map_err(|msg| {
                Error::InvalidCatalog(format!("{msg} in path template {template}"))
            })?;
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn validate(&self) -> std::result::Result<(), String> {
        for segment in &self.segments {
            validate_segment(segment).map_err(|msg| format!("{msg} in path template {self}"))?;
        }
        Ok(())
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment {
                Segment::Literal(v) => f.write_str(v)?,
                Segment::Param(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}

impl Serialize for PathTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationSpec {
    pub name: String,
    pub method: Method,
    pub path: PathTemplate,
    pub params: Vec<ParamSpec>,
    pub response: ResponseShape,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl OperationSpec {
    pub fn get(name: impl Into<String>, path: PathTemplate, params: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            method: Method::Get,
            path,
            params,
            response: ResponseShape::Any,
            summary: None,
        }
    }

    pub fn with_response(mut self, response: ResponseShape) -> Self {
        self.response = response;
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    fn from_def(def: OperationDef) -> Result<Self> {
        let path = PathTemplate::parse(&def.path)
            .map_err(|err| Error::InvalidCatalog(format!("operation {}: {err}", def.name)))?;
        Ok(Self {
            name: def.name,
            method: def.method,
            path,
            params: def.params,
            response: def.response,
            summary: def.summary,
        })
    }
}

/// Every operation the service exposes, validated once and read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointCatalog {
    default_base_url: String,
    root: PathTemplate,
    globals: Vec<ParamSpec>,
    operations: Vec<OperationSpec>,
    #[serde(skip)]
    index: BTreeMap<String, usize>,
}

impl EndpointCatalog {
    pub fn new(
        default_base_url: impl Into<String>,
        root: PathTemplate,
        globals: Vec<ParamSpec>,
        operations: Vec<OperationSpec>,
    ) -> Result<Self> {
        validate_globals(&root, &globals)?;
        let mut index = BTreeMap::new();
        for (i, op) in operations.iter().enumerate() {
            if index.insert(op.name.clone(), i).is_some() {
                return Err(Error::InvalidCatalog(format!(
                    "duplicate operation {}",
                    op.name
                )));
            }
            validate_operation(&root, &globals, op)?;
        }
        Ok(Self {
            default_base_url: default_base_url.into(),
            root,
            globals,
            operations,
            index,
        })
    }

    pub fn from_source(source: CatalogSource) -> Result<Self> {
        let root = PathTemplate::parse(&source.root)?;
        let operations = source
            .operations
            .into_iter()
            .map(OperationSpec::from_def)
            .collect::<Result<Vec<_>>>()?;
        Self::new(source.default_base_url, root, source.globals, operations)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let source: CatalogSource = serde_json::from_str(raw)
            .map_err(|err| Error::InvalidCatalog(format!("parse catalog: {err}")))?;
        Self::from_source(source)
    }

    pub fn builtin() -> Result<Self> {
        Self::from_json(include_str!("../schemas/catalog.json"))
    }

    pub fn lookup(&self, name: &str) -> Result<&OperationSpec> {
        self.index
            .get(name)
            .map(|&i| &self.operations[i])
            .ok_or_else(|| Error::UnknownOperation(name.to_string()))
    }

    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|op| op.name.as_str())
    }

    pub fn root(&self) -> &PathTemplate {
        &self.root
    }

    pub fn globals(&self) -> &[ParamSpec] {
        &self.globals
    }

    pub fn default_base_url(&self) -> &str {
        &self.default_base_url
    }
}

fn validate_param(param: &ParamSpec) -> std::result::Result<(), String> {
    if param.required && param.default.is_some() {
        return Err(format!(
            "required parameter {} must not have a default",
            param.name
        ));
    }
    if param.location == ParamLocation::Path && !param.required && param.default.is_none() {
        return Err(format!(
            "optional path parameter {} needs a default",
            param.name
        ));
    }
    if param.param_type == ParamType::Enum && param.allowed.is_empty() {
        return Err(format!("enum parameter {} has no allowed values", param.name));
    }
    if let Some(default) = &param.default {
        param.check(default).map_err(|err| err.to_string())?;
    }
    Ok(())
}

/// Root placeholders may only name global path parameters, and each global
/// path parameter sits in the root exactly once.
fn validate_globals(root: &PathTemplate, globals: &[ParamSpec]) -> Result<()> {
    let invalid = |msg: String| Error::InvalidCatalog(format!("globals: {msg}"));

    root.validate().map_err(invalid)?;
    let mut seen = BTreeSet::new();
    for param in globals {
        if !seen.insert(param.name.as_str()) {
            return Err(invalid(format!("duplicate parameter {}", param.name)));
        }
        validate_param(param).map_err(invalid)?;
    }

    let placeholders: Vec<&str> = root.placeholders().collect();
    for name in &placeholders {
        let declared = globals
            .iter()
            .any(|p| p.name == *name && p.location == ParamLocation::Path);
        if !declared {
            return Err(invalid(format!(
                "root placeholder {{{name}}} has no matching global path parameter"
            )));
        }
    }
    for param in globals.iter().filter(|p| p.location == ParamLocation::Path) {
        let count = placeholders.iter().filter(|n| **n == param.name).count();
        if count != 1 {
            return Err(invalid(format!(
                "path parameter {} appears {count} times in the root template",
                param.name
            )));
        }
    }
    Ok(())
}

fn validate_operation(
    root: &PathTemplate,
    globals: &[ParamSpec],
    op: &OperationSpec,
) -> Result<()> {
    let invalid = |msg: String| Error::InvalidCatalog(format!("operation {}: {msg}", op.name));

    op.path.validate().map_err(invalid)?;
    let mut seen: BTreeSet<&str> = globals.iter().map(|p| p.name.as_str()).collect();
    for param in &op.params {
        if !seen.insert(param.name.as_str()) {
            return Err(invalid(format!("duplicate parameter {}", param.name)));
        }
        validate_param(param).map_err(invalid)?;
    }

    let placeholders: Vec<&str> = root.placeholders().chain(op.path.placeholders()).collect();
    for name in &placeholders {
        let declared = globals
            .iter()
            .chain(&op.params)
            .any(|p| p.name == *name && p.location == ParamLocation::Path);
        if !declared {
            return Err(invalid(format!(
                "placeholder {{{name}}} has no matching path parameter"
            )));
        }
    }
    for param in globals.iter().chain(&op.params) {
        if param.location != ParamLocation::Path {
            continue;
        }
        let count = placeholders.iter().filter(|n| **n == param.name).count();
        if count != 1 {
            return Err(invalid(format!(
                "path parameter {} appears {count} times in the path template",
                param.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globals() -> Vec<ParamSpec> {
        vec![
            ParamSpec::path("Subscription").required(),
            ParamSpec::path("format").with_default("json"),
            ParamSpec::query("key").required(),
        ]
    }

    fn root() -> PathTemplate {
        PathTemplate::parse("{Subscription}/{format}").unwrap()
    }

    fn teams() -> OperationSpec {
        OperationSpec::get(
            "Teams",
            PathTemplate::new(vec![
                Segment::Literal("Teams".to_string()),
                Segment::Param("Season".to_string()),
            ]),
            vec![ParamSpec::path("Season").required().of_type(ParamType::Season)],
        )
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = EndpointCatalog::builtin().unwrap();
        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(
            names,
            [
                "AreAnyGamesInProgress",
                "Teams",
                "Schedules",
                "TeamSeasonStats",
                "Timeframes"
            ]
        );
        assert_eq!(catalog.root().to_string(), "{Subscription}/{format}");
        let teams = catalog.lookup("Teams").unwrap();
        assert_eq!(teams.response, ResponseShape::Array);
        assert_eq!(teams.path.to_string(), "Teams/{Season}");
        assert_eq!(
            catalog.lookup("AreAnyGamesInProgress").unwrap().response,
            ResponseShape::Boolean
        );
    }

    #[test]
    fn lookup_unknown_operation() {
        let catalog = EndpointCatalog::builtin().unwrap();
        let err = catalog.lookup("Players").unwrap_err();
        assert!(matches!(err, Error::UnknownOperation(ref n) if n == "Players"));
    }

    #[test]
    fn parses_literals_and_placeholders() {
        let t = PathTemplate::parse("/Teams/{Season}/").unwrap();
        assert_eq!(
            t.segments(),
            [
                Segment::Literal("Teams".to_string()),
                Segment::Param("Season".to_string())
            ]
        );
        assert!(PathTemplate::parse("").unwrap().segments().is_empty());
    }

    #[test]
    fn rejects_malformed_templates() {
        for bad in ["Teams/{}", "Teams/{Season", "Teams/Season}", "Teams//{Season}", "a{b}"] {
            assert!(
                matches!(PathTemplate::parse(bad), Err(Error::InvalidCatalog(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_placeholder_without_param() {
        let path = PathTemplate::parse("Teams/{Season}").unwrap();
        let op = OperationSpec::get("Teams", path, vec![]);
        let err = EndpointCatalog::new("http://x", root(), globals(), vec![op]).unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(ref m) if m.contains("{Season}")));
    }

    #[test]
    fn rejects_path_param_missing_or_repeated() {
        let missing = OperationSpec::get(
            "Teams",
            PathTemplate::parse("Teams").unwrap(),
            vec![ParamSpec::path("Season").required()],
        );
        assert!(matches!(
            EndpointCatalog::new("http://x", root(), globals(), vec![missing]),
            Err(Error::InvalidCatalog(_))
        ));

        let repeated = OperationSpec::get(
            "Teams",
            PathTemplate::parse("Teams/{Season}/{Season}").unwrap(),
            vec![ParamSpec::path("Season").required()],
        );
        let err = EndpointCatalog::new("http://x", root(), globals(), vec![repeated]).unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(ref m) if m.contains("2 times")));
    }

    #[test]
    fn rejects_required_param_with_default() {
        let op = OperationSpec::get(
            "Teams",
            PathTemplate::parse("Teams/{Season}").unwrap(),
            vec![ParamSpec::path("Season").required().with_default("2014")],
        );
        assert!(matches!(
            EndpointCatalog::new("http://x", root(), globals(), vec![op]),
            Err(Error::InvalidCatalog(_))
        ));
    }

    #[test]
    fn rejects_duplicates() {
        let err = EndpointCatalog::new("http://x", root(), globals(), vec![teams(), teams()])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(ref m) if m.contains("duplicate operation")));

        let shadowing = OperationSpec::get(
            "Teams",
            PathTemplate::parse("Teams").unwrap(),
            vec![ParamSpec::query("key")],
        );
        let err = EndpointCatalog::new("http://x", root(), globals(), vec![shadowing]).unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(ref m) if m.contains("duplicate parameter key")));
    }

    #[test]
    fn rejects_enum_without_values_and_bad_defaults() {
        let op = OperationSpec::get(
            "Timeframes",
            PathTemplate::parse("Timeframes").unwrap(),
            vec![ParamSpec::query("Type").of_type(ParamType::Enum)],
        );
        assert!(EndpointCatalog::new("http://x", root(), globals(), vec![op]).is_err());

        let op = OperationSpec::get(
            "Timeframes",
            PathTemplate::parse("Timeframes").unwrap(),
            vec![ParamSpec::query("Type").one_of(["current"]).with_default("never")],
        );
        assert!(EndpointCatalog::new("http://x", root(), globals(), vec![op]).is_err());
    }

    #[test]
    fn rejects_malformed_typed_segments() {
        let bad_segments = [
            Segment::Literal("Teams?x=1".to_string()),
            Segment::Literal("{Season".to_string()),
            Segment::Literal("a/b".to_string()),
            Segment::Literal(String::new()),
            Segment::Param(String::new()),
            Segment::Param("Sea}son".to_string()),
        ];
        for segment in bad_segments {
            let op = OperationSpec::get(
                "Teams",
                PathTemplate::new(vec![Segment::Literal("Teams".to_string()), segment.clone()]),
                vec![],
            );
            let err = EndpointCatalog::new("http://x", root(), globals(), vec![op]).unwrap_err();
            assert!(matches!(err, Error::InvalidCatalog(_)), "{segment:?} accepted");

            let bad_root = PathTemplate::new(vec![segment.clone()]);
            let err = EndpointCatalog::new("http://x", bad_root, vec![], vec![]).unwrap_err();
            assert!(matches!(err, Error::InvalidCatalog(_)), "root {segment:?} accepted");
        }
    }

    #[test]
    fn rejects_optional_path_param_without_default() {
        let op = OperationSpec::get(
            "Teams",
            PathTemplate::parse("Teams/{Season}").unwrap(),
            vec![ParamSpec::path("Season")],
        );
        let err = EndpointCatalog::new("http://x", root(), globals(), vec![op]).unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(ref m) if m.contains("needs a default")));

        let op = OperationSpec::get(
            "Teams",
            PathTemplate::parse("Teams/{Season}").unwrap(),
            vec![ParamSpec::path("Season").with_default("2014")],
        );
        assert!(EndpointCatalog::new("http://x", root(), globals(), vec![op]).is_ok());
    }

    #[test]
    fn globals_are_checked_without_operations() {
        let duplicate = vec![ParamSpec::query("key").required(), ParamSpec::query("key")];
        let err = EndpointCatalog::new("http://x", PathTemplate::default(), duplicate, vec![])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(ref m) if m.contains("duplicate parameter key")));

        let defaulted = vec![ParamSpec::query("key").required().with_default("K")];
        assert!(
            EndpointCatalog::new("http://x", PathTemplate::default(), defaulted, vec![]).is_err()
        );

        let undeclared = PathTemplate::parse("{Subscription}").unwrap();
        let err = EndpointCatalog::new("http://x", undeclared, vec![], vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(ref m) if m.contains("{Subscription}")));

        let unplaced = vec![ParamSpec::path("Subscription").required()];
        assert!(
            EndpointCatalog::new("http://x", PathTemplate::default(), unplaced, vec![]).is_err()
        );
    }

    #[test]
    fn from_json_reports_parse_errors() {
        let err = EndpointCatalog::from_json("{\"version\": 1}").unwrap_err();
        assert!(matches!(err, Error::InvalidCatalog(ref m) if m.starts_with("parse catalog")));
    }

    #[test]
    fn season_values() {
        let season = ParamSpec::path("Season").of_type(ParamType::Season);
        for ok in ["2014", "2013REG", "2014PRE", "2015POST"] {
            assert!(season.check(ok).is_ok(), "{ok}");
        }
        for bad in ["14", "20145", "2014reg", "abcd", "", "2014REGX", "201é"] {
            let err = season.check(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidParameterValue { ref name, .. } if name == "Season"));
        }
    }
}

//! JUnit XML -> [`RunResult`].
//!
//! Accepts a `<testsuites>` root or a bare `<testsuite>` root. Only the parts
//! of the format testdelta compares on are read; everything else is ignored.

use crate::AdapterError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use testdelta_types::{RunResult, TestError, TestRecord, TestStatus, TestSuite};

static TESTSUITES_TAG: &str = "testsuites";
static TESTSUITE_TAG: &str = "testsuite";
static TESTCASE_TAG: &str = "testcase";
static FAILURE_TAG: &str = "failure";
static ERROR_TAG: &str = "error";
static SKIPPED_TAG: &str = "skipped";
static SYSTEM_OUT_TAG: &str = "system-out";
static SYSTEM_ERR_TAG: &str = "system-err";

const UNKNOWN: &str = "unknown";

/// Parse a JUnit XML document.
///
/// Times are converted from seconds to milliseconds. The run timestamp comes
/// from the root (or first suite) `timestamp` attribute, falling back to now.
pub fn parse_junit_str(xml: &str) -> Result<RunResult, AdapterError> {
    let root = read_tree(xml)?;

    let suite_elements: Vec<&Element> = if root.name == TESTSUITES_TAG {
        root.children_named(TESTSUITE_TAG).collect()
    } else if root.name == TESTSUITE_TAG {
        vec![&root]
    } else {
        return Err(AdapterError::MissingRoot);
    };

    let timestamp = root
        .attr("timestamp")
        .or_else(|| suite_elements.first().and_then(|s| s.attr("timestamp")))
        .map(str::to_string)
        .unwrap_or_else(now_rfc3339);

    let suites = suite_elements.into_iter().map(parse_suite).collect();

    Ok(RunResult::from_suites(suites, timestamp))
}

fn parse_suite(suite: &Element) -> TestSuite {
    let name = suite.attr_or("name", UNKNOWN);
    let tests = suite
        .children_named(TESTCASE_TAG)
        .map(|tc| parse_testcase(tc, name))
        .collect();

    TestSuite::new(
        name,
        tests,
        suite.attr("timestamp").map(str::to_string),
        seconds_attr_as_ms(suite),
    )
}

fn parse_testcase(testcase: &Element, suite_name: &str) -> TestRecord {
    let (status, error) = if testcase.child(SKIPPED_TAG).is_some() {
        (TestStatus::Skipped, None)
    } else if let Some(failure) = testcase.child(FAILURE_TAG) {
        (TestStatus::Failed, Some(parse_error(failure, "AssertionError")))
    } else if let Some(error) = testcase.child(ERROR_TAG) {
        (TestStatus::Failed, Some(parse_error(error, "Error")))
    } else {
        (TestStatus::Passed, None)
    };

    TestRecord {
        name: testcase.attr_or("name", UNKNOWN).to_string(),
        class_name: testcase.attr_or("classname", suite_name).to_string(),
        status,
        duration_ms: seconds_attr_as_ms(testcase),
        error,
        stdout: testcase.child_text(SYSTEM_OUT_TAG),
        stderr: testcase.child_text(SYSTEM_ERR_TAG),
    }
}

fn parse_error(element: &Element, default_type: &str) -> TestError {
    let text = element.text.trim();
    TestError {
        error_type: element.attr_or("type", default_type).to_string(),
        message: element.attr_or("message", text).to_string(),
        stacktrace: text.to_string(),
    }
}

fn seconds_attr_as_ms(element: &Element) -> f64 {
    element
        .attr("time")
        .and_then(|t| t.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(0.0, |secs| secs * 1000.0)
}

fn now_rfc3339() -> String {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

// ----------------------------
// Minimal element tree
// ----------------------------

#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, AdapterError> {
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attrs,
            ..Self::default()
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, or `default` when missing or empty.
    fn attr_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.attr(key) {
            Some(v) if !v.is_empty() => v,
            _ => default,
        }
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn child<'a>(&'a self, name: &'a str) -> Option<&'a Element> {
        self.children_named(name).next()
    }

    fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

fn read_tree(xml: &str) -> Result<Element, AdapterError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(cdata) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(AdapterError::Unclosed(open.name));
    }

    root.ok_or(AdapterError::MissingRoot)
}

// First top-level element wins as root.
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Arbitrary input must never panic, only succeed or error.
        #[test]
        fn never_panics_on_arbitrary_input(s in ".{0,200}") {
            let _ = parse_junit_str(&s);
        }

        #[test]
        fn counts_match_generated_cases(passed in 0usize..10, failed in 0usize..10, skipped in 0usize..10) {
            let mut xml = String::from("<testsuite name=\"gen\">");
            for i in 0..passed {
                xml.push_str(&format!("<testcase name=\"p{i}\"/>"));
            }
            for i in 0..failed {
                xml.push_str(&format!("<testcase name=\"f{i}\"><failure message=\"m{i}\"/></testcase>"));
            }
            for i in 0..skipped {
                xml.push_str(&format!("<testcase name=\"s{i}\"><skipped/></testcase>"));
            }
            xml.push_str("</testsuite>");

            let run = parse_junit_str(&xml).unwrap();
            prop_assert_eq!(run.passed as usize, passed);
            prop_assert_eq!(run.failed as usize, failed);
            prop_assert_eq!(run.skipped as usize, skipped);
        }
    }
}

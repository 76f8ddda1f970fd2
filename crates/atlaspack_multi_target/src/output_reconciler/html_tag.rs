use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
  Bool(bool),
  String(String),
}

impl From<bool> for AttributeValue {
  fn from(value: bool) -> Self {
    AttributeValue::Bool(value)
  }
}

impl From<&str> for AttributeValue {
  fn from(value: &str) -> Self {
    AttributeValue::String(value.to_string())
  }
}

/// A tag the markup generator is about to render
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlTag {
  pub tag_name: String,
  #[serde(default)]
  pub attributes: IndexMap<String, AttributeValue>,
  #[serde(default)]
  pub void_tag: bool,
  pub inner_html: Option<String>,
}

impl HtmlTag {
  pub fn new(tag_name: impl Into<String>) -> Self {
    HtmlTag {
      tag_name: tag_name.into(),
      ..HtmlTag::default()
    }
  }

  pub fn script(src: &str) -> Self {
    HtmlTag::new("script").with_attribute("src", src)
  }

  pub fn with_attribute(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
    self.set_attribute(name, value);
    self
  }

  pub fn set_attribute(&mut self, name: &str, value: impl Into<AttributeValue>) {
    self.attributes.insert(name.to_string(), value.into());
  }

  pub fn is_script(&self) -> bool {
    self.tag_name == "script"
  }

  pub fn src(&self) -> Option<&str> {
    match self.attributes.get("src") {
      Some(AttributeValue::String(src)) if !src.is_empty() => Some(src),
      _ => None,
    }
  }

  /// A script loaded as an ES module
  pub fn is_module(&self) -> bool {
    matches!(self.attributes.get("type"), Some(AttributeValue::String(kind)) if kind == "module")
  }

  /// A script skipped by engines that support ES modules
  pub fn is_no_module(&self) -> bool {
    match self.attributes.get("nomodule") {
      Some(AttributeValue::Bool(value)) => *value,
      Some(AttributeValue::String(_)) => true,
      None => false,
    }
  }
}

/// Moves module scripts ahead of the other scripts and defers `nomodule` scripts
///
/// Only external scripts are moved. They swap slots among themselves, so every other tag keeps
/// its position and the relative order within module and classic scripts is preserved.
pub fn order_script_tags(tags: &mut [HtmlTag]) {
  let slots = tags
    .iter()
    .enumerate()
    .filter(|(_, tag)| tag.is_script() && tag.src().is_some())
    .map(|(index, _)| index)
    .collect::<Vec<_>>();

  let (modules, classic): (Vec<_>, Vec<_>) = slots
    .iter()
    .map(|index| tags[*index].clone())
    .partition(HtmlTag::is_module);

  for (slot, tag) in slots.into_iter().zip(modules.into_iter().chain(classic)) {
    tags[slot] = tag;
  }

  for tag in tags.iter_mut() {
    if tag.is_script() && tag.is_no_module() {
      tag.set_attribute("defer", true);
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn srcs(tags: &[HtmlTag]) -> Vec<Option<&str>> {
    tags.iter().map(HtmlTag::src).collect()
  }

  #[test]
  fn renders_module_scripts_first() {
    let mut tags = vec![
      HtmlTag::script("a.js").with_attribute("type", "module"),
      HtmlTag::script("b.js").with_attribute("nomodule", true),
      HtmlTag::script("c.js").with_attribute("type", "module"),
    ];

    order_script_tags(&mut tags);

    assert_eq!(srcs(&tags), vec![Some("a.js"), Some("c.js"), Some("b.js")]);
    assert_eq!(tags[2].attributes.get("defer"), Some(&AttributeValue::Bool(true)));
    assert_eq!(tags[0].attributes.get("defer"), None);
    assert_eq!(tags[1].attributes.get("defer"), None);
  }

  #[test]
  fn keeps_other_tags_in_place() {
    let mut tags = vec![
      HtmlTag::script("vendor.js"),
      HtmlTag::new("link").with_attribute("href", "main.css"),
      HtmlTag {
        inner_html: Some(String::from("window.env = {}")),
        ..HtmlTag::new("script")
      },
      HtmlTag::script("main.modern.js").with_attribute("type", "module"),
    ];

    order_script_tags(&mut tags);

    assert_eq!(
      tags.iter().map(|tag| tag.tag_name.as_str()).collect::<Vec<_>>(),
      vec!["script", "link", "script", "script"]
    );
    assert_eq!(
      srcs(&tags),
      vec![Some("main.modern.js"), None, None, Some("vendor.js")]
    );
  }

  #[test]
  fn reads_attributes_from_markup_json() {
    let tag: HtmlTag = serde_json::from_str(
      r#"{ "tagName": "script", "attributes": { "src": "main.js", "nomodule": true } }"#,
    )
    .unwrap();

    assert!(tag.is_no_module());
    assert!(!tag.is_module());
    assert_eq!(tag.src(), Some("main.js"));
  }
}

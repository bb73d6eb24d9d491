//! Configuration-file templates.
//!
//! Stages only know template names and the data to feed them; the text lives
//! in `templates/` and is rendered with Go template syntax.

use std::{collections::HashMap, io::Write};

use gtmpl_value::Value;

use crate::{config::Filesystem, error::TemplateError};

/// Data handed to a template.
#[derive(Debug, Clone, Copy)]
pub enum TemplateData<'a> {
    Text(&'a str),
    Clock { timezone: &'a str, keyboard: &'a str },
    Filesystems(&'a [Filesystem]),
}

/// Renders a named template into a writer.
pub trait Templates: Send + Sync {
    fn render(
        &self,
        name: &str,
        data: TemplateData<'_>,
        out: &mut dyn Write,
    ) -> Result<(), TemplateError>;
}

/// The templates shipped with the installer.
#[derive(Debug, Clone)]
pub struct BuiltinTemplates {
    sources: HashMap<&'static str, &'static str>,
}

impl Default for BuiltinTemplates {
    fn default() -> Self {
        let sources = HashMap::from([
            ("hosts", include_str!("../templates/hosts")),
            ("rc.conf", include_str!("../templates/rc.conf")),
            ("locale.conf", include_str!("../templates/locale.conf")),
            ("fstab", include_str!("../templates/fstab")),
        ]);
        Self { sources }
    }
}

impl Templates for BuiltinTemplates {
    fn render(
        &self,
        name: &str,
        data: TemplateData<'_>,
        out: &mut dyn Write,
    ) -> Result<(), TemplateError> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;

        let rendered = gtmpl::template(source, to_value(name, data)?).map_err(|e| {
            TemplateError::Render {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;

        out.write_all(rendered.as_bytes())
            .map_err(|source| TemplateError::Write {
                name: name.to_string(),
                source,
            })
    }
}

/// Rejects values that would spill onto a new line or break quoting.
fn field(template: &str, value: &str) -> Result<Value, TemplateError> {
    if value.contains(['\n', '\r', '"']) {
        return Err(TemplateError::InvalidValue {
            name: template.to_string(),
            value: value.to_string(),
        });
    }
    Ok(Value::String(value.to_string()))
}

fn object<const N: usize>(pairs: [(&str, Value); N]) -> Value {
    Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn to_value(template: &str, data: TemplateData<'_>) -> Result<Value, TemplateError> {
    match data {
        TemplateData::Text(text) => field(template, text),
        TemplateData::Clock { timezone, keyboard } => Ok(object([
            ("TimeZone", field(template, timezone)?),
            ("Keyboard", field(template, keyboard)?),
        ])),
        TemplateData::Filesystems(list) => {
            let mut rows = Vec::with_capacity(list.len());
            for fs in list {
                if [&fs.source, &fs.mount_point, &fs.fs_type, &fs.options]
                    .iter()
                    .any(|v| v.is_empty() || v.contains(char::is_whitespace))
                {
                    return Err(TemplateError::InvalidValue {
                        name: template.to_string(),
                        value: format!("{:?}", fs),
                    });
                }
                rows.push(object([
                    ("FS", field(template, &fs.source)?),
                    ("MountTo", field(template, &fs.mount_point)?),
                    ("Type", field(template, &fs.fs_type)?),
                    ("Options", field(template, &fs.options)?),
                    ("Dump", Value::String(fs.dump.to_string())),
                    ("Pass", Value::String(fs.pass.to_string())),
                ]));
            }
            Ok(Value::Array(rows))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(name: &str, data: TemplateData<'_>) -> Result<String, TemplateError> {
        let mut out = Vec::new();
        BuiltinTemplates::default().render(name, data, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn hosts_names_the_machine() {
        let hosts = render("hosts", TemplateData::Text("void-test")).unwrap();
        assert!(hosts.lines().any(|l| l.starts_with("127.0.1.1") && l.ends_with("void-test")));
    }

    #[test]
    fn rc_conf_sets_clock_and_keymap() {
        let rc = render(
            "rc.conf",
            TemplateData::Clock {
                timezone: "Europe/Berlin",
                keyboard: "de",
            },
        )
        .unwrap();
        assert!(rc.contains("TIMEZONE=\"Europe/Berlin\""));
        assert!(rc.contains("KEYMAP=\"de\""));
    }

    #[test]
    fn fstab_has_one_line_per_entry() {
        let entries = [
            Filesystem {
                source: "/dev/sda2".into(),
                mount_point: "/".into(),
                fs_type: "ext4".into(),
                options: "defaults".into(),
                dump: 0,
                pass: 1,
            },
            Filesystem {
                source: "/dev/sda1".into(),
                mount_point: "/boot/efi".into(),
                fs_type: "vfat".into(),
                options: "defaults".into(),
                dump: 0,
                pass: 2,
            },
        ];
        let fstab = render("fstab", TemplateData::Filesystems(&entries)).unwrap();
        let rows: Vec<&str> = fstab
            .lines()
            .filter(|l| l.starts_with("/dev/"))
            .collect();
        assert_eq!(rows, ["/dev/sda2\t/\text4\tdefaults\t0\t1", "/dev/sda1\t/boot/efi\tvfat\tdefaults\t0\t2"]);
    }

    #[test]
    fn unknown_template_is_reported() {
        let err = render("resolv.conf", TemplateData::Text("x")).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(ref n) if n == "resolv.conf"));
    }

    #[test]
    fn newlines_cannot_be_injected() {
        let err = render("locale.conf", TemplateData::Text("en_US.UTF-8\nLC_ALL=C")).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidValue { .. }));
    }
}

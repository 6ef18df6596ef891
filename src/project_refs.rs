//! Point the Halcon assembly references of C# projects at the Halcon root.
//!
//! Every `*.csproj` one level below the solution directory is streamed
//! through the XML reader. Only the `HintPath` of a `Reference` whose
//! `Include` names `halcondotnet` is replaced, all other events are written
//! back untouched.

use glob::glob;
use log::{info, warn};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::list_subdirs;

const HALCON_ASSEMBLY: &str = "halcondotnet";

/// New hint path: `halcon_root` joined with the part of `hint_path` starting at `bin`
pub fn halcon_hint_path(hint_path: &str, halcon_root: &str) -> Option<String> {
    let suffix = &hint_path[hint_path.find("bin")?..];
    Some(format!("{}\\{}", halcon_root.trim_end_matches(['\\', '/']), suffix))
}

/// Rewrite the Halcon hint paths of one project file's XML.
/// Returns the new document and the number of replacements.
pub fn rewrite_hint_paths(xml: &str, halcon_root: &str) -> Result<(String, usize)> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut in_halcon_reference = false;
    let mut in_hint_path = false;
    let mut replaced = 0;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"Reference" => {
                in_halcon_reference = match e.try_get_attribute("Include").map_err(quick_xml::Error::from)? {
                    Some(attr) => attr.decode_and_unescape_value(&reader)?.contains(HALCON_ASSEMBLY),
                    None => false,
                };
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) if e.local_name().as_ref() == b"Reference" => {
                in_halcon_reference = false;
                writer.write_event(Event::End(e))?;
            }
            Event::Start(e) if in_halcon_reference && e.local_name().as_ref() == b"HintPath" => {
                in_hint_path = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) if e.local_name().as_ref() == b"HintPath" => {
                in_hint_path = false;
                writer.write_event(Event::End(e))?;
            }
            Event::Text(t) if in_hint_path => {
                let old = t.unescape()?.into_owned();
                match halcon_hint_path(&old, halcon_root) {
                    Some(new) => {
                        info!("replacing: {} with: {}", old, new);
                        writer.write_event(Event::Text(BytesText::new(&new)))?;
                        replaced += 1;
                    }
                    None => {
                        warn!("Hint path {} has no bin directory, leaving it", old);
                        writer.write_event(Event::Text(t))?;
                    }
                }
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    let rewritten = String::from_utf8(writer.into_inner())
        .map_err(|e| Error::Parse(format!("rewritten project is not UTF-8: {}", e)))?;
    Ok((rewritten, replaced))
}

/// Fix every `*.csproj` in the immediate sub-directories of `root`.
/// Returns the total number of replaced hint paths.
pub fn fix_references(root: &Path, halcon_root: &str) -> Result<usize> {
    let mut total = 0;
    for dir in list_subdirs(root)? {
        let pattern = format!("{}/*.csproj", glob::Pattern::escape(&dir.to_string_lossy()));
        for project in glob(&pattern)?.filter_map(|entry| entry.ok()) {
            let xml = fs::read_to_string(&project)?;
            let (rewritten, replaced) = rewrite_hint_paths(&xml, halcon_root)?;
            if replaced > 0 {
                fs::write(&project, rewritten)?;
                info!("written to: {}", project.display());
            }
            total += replaced;
        }
    }
    Ok(total)
}

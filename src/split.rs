use crate::{
    chunk_plan::{PageRange, chunk_path, validate_all},
    engine::types::{ChunkRequest, SplitChunk},
    error::{AdapterError, AdapterResult},
    util::{ensure_dir, sha256_hex},
};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITED: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];
const MAX_TREE_DEPTH: usize = 32;

/// Writes one PDF per requested range into `out_dir`.
///
/// Every range is validated before anything touches the filesystem, so an
/// invalid range anywhere in the batch leaves no partial output behind.
pub fn split_pdf(
    input: &Path,
    out_dir: &Path,
    requests: &[ChunkRequest],
) -> AdapterResult<Vec<SplitChunk>> {
    let source = Document::load(input).map_err(|e| AdapterError::source_read(input, e))?;
    let pages = source.get_pages();
    let ranges = validate_all(requests, pages.len() as u32)?;

    ensure_dir(out_dir)?;

    let mut outputs = Vec::with_capacity(ranges.len());
    for (i, range) in ranges.iter().enumerate() {
        let bytes = extract_range(&source, &pages, range)?;
        let path = chunk_path(out_dir, i, range);
        std::fs::write(&path, &bytes).map_err(|e| AdapterError::write(&path, e))?;
        info!(
            "chunk {} pages {}-{} -> {} ({} bytes)",
            i,
            range.start_page,
            range.end_page,
            path.display(),
            bytes.len()
        );
        outputs.push(SplitChunk {
            chunk_index: i as u32,
            start_page: range.start_page,
            end_page: range.end_page,
            path: path.display().to_string(),
            sha256: sha256_hex(&bytes),
        });
    }
    Ok(outputs)
}

/// Serializes a new document holding only the pages in `range`, in order.
///
/// Kept pages are re-parented directly under the root page tree node with
/// their inherited attributes made explicit. Only objects reachable from
/// those pages are copied; references to anything not copied (pages outside
/// the range, objects missing from the source) become null.
pub fn extract_range(
    source: &Document,
    pages: &BTreeMap<u32, ObjectId>,
    range: &PageRange,
) -> AdapterResult<Vec<u8>> {
    let fail = |what: String| {
        AdapterError::Conversion(format!(
            "pages {}-{}: {what}",
            range.start_page, range.end_page
        ))
    };
    let catalog_id = source
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|e| fail(format!("no document catalog: {e}")))?;
    let tree_id = source
        .catalog()
        .and_then(|c| c.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| fail(format!("no page tree: {e}")))?;

    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut kids = Vec::with_capacity(range.len() as usize);
    for page in range.pages() {
        let page_id = *pages
            .get(&page)
            .ok_or_else(|| fail(format!("page {page} missing from page tree")))?;
        let mut dict = source
            .get_dictionary(page_id)
            .map_err(|e| fail(format!("page {page}: {e}")))?
            .clone();
        for key in INHERITED {
            if !dict.has(key) {
                if let Some(value) = inherited(source, &dict, key) {
                    dict.set(key, value.clone());
                }
            }
        }
        dict.set("Parent", tree_id);
        objects.insert(page_id, Object::Dictionary(dict));
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    objects.insert(
        tree_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    objects.insert(
        catalog_id,
        Object::Dictionary(dictionary! {
            "Type" => "Catalog",
            "Pages" => tree_id,
        }),
    );

    let mut pending = Vec::new();
    for obj in objects.values() {
        collect_refs(obj, &mut pending);
    }
    while let Some(id) = pending.pop() {
        if objects.contains_key(&id) {
            continue;
        }
        let Some(obj) = source.objects.get(&id) else {
            continue;
        };
        if is_page_node(obj) {
            continue;
        }
        collect_refs(obj, &mut pending);
        objects.insert(id, obj.clone());
    }
    let kept: BTreeSet<ObjectId> = objects.keys().copied().collect();
    for obj in objects.values_mut() {
        null_dangling(obj, &kept);
    }
    debug!(
        "pages {}-{}: copied {} of {} objects",
        range.start_page,
        range.end_page,
        objects.len(),
        source.objects.len()
    );

    let mut doc = Document::with_version(source.version.clone());
    doc.max_id = objects.keys().map(|&(id, _)| id).max().unwrap_or(0);
    doc.objects = objects;
    doc.trailer.set("Root", catalog_id);
    doc.renumber_objects();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| fail(format!("writing chunk: {e}")))?;
    Ok(buf)
}

/// Nearest ancestor value of `key`, starting from the page's parent.
fn inherited<'a>(source: &'a Document, page: &Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        let node = source.get_dictionary(parent).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

fn is_page_node(obj: &Object) -> bool {
    obj.as_dict()
        .is_ok_and(|d| d.has_type(b"Page") || d.has_type(b"Pages"))
}

fn collect_refs(obj: &Object, out: &mut Vec<ObjectId>) {
    match obj {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|o| collect_refs(o, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, o)| collect_refs(o, out)),
        Object::Stream(stream) => stream.dict.iter().for_each(|(_, o)| collect_refs(o, out)),
        _ => {}
    }
}

fn null_dangling(obj: &mut Object, kept: &BTreeSet<ObjectId>) {
    match obj {
        Object::Reference(id) => {
            if !kept.contains(id) {
                *obj = Object::Null;
            }
        }
        Object::Array(items) => items.iter_mut().for_each(|o| null_dangling(o, kept)),
        Object::Dictionary(dict) => dict.iter_mut().for_each(|(_, o)| null_dangling(o, kept)),
        Object::Stream(stream) => stream
            .dict
            .iter_mut()
            .for_each(|(_, o)| null_dangling(o, kept)),
        _ => {}
    }
}

//! Output name allocation.
//!
//! Names come from the keyword queue while it lasts, then from the item's
//! original name plus a four-digit random suffix. An allocator lives for one
//! run and never hands out the same name twice.

use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use drivesite_shared::{DriveSiteError, RemoteItem, Result};
use drivesite_storage::KeywordQueue;

/// Re-rolls allowed for a random suffix before giving up on an item.
pub const MAX_SUFFIX_ATTEMPTS: usize = 32;

/// Longest stem in bytes; suffix and extension are added on top.
pub const MAX_STEM_BYTES: usize = 200;

/// Stem used when sanitizing leaves nothing.
const FALLBACK_STEM: &str = "document";

/// A name chosen for one item, with the keyword queue as it would be after
/// the item succeeds.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub name: String,
    pub queue_after: KeywordQueue,
    /// The name was derived from a keyword.
    pub from_keyword: bool,
}

/// Per-run name allocator.
#[derive(Debug, Default)]
pub struct NameAllocator {
    /// Names handed out during this run.
    allocated: HashSet<String>,
    /// Documents already in the output directory.
    existing: HashSet<String>,
}

impl NameAllocator {
    /// Create an allocator aware of the documents already on disk.
    ///
    /// Keyword names may overwrite an existing document of the same name;
    /// random-suffix names never do.
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allocated: HashSet::new(),
            existing: existing.into_iter().map(Into::into).collect(),
        }
    }

    /// Allocate and reserve a name for `item`.
    pub fn allocate<R: Rng + ?Sized>(
        &mut self,
        item: &RemoteItem,
        queue: &KeywordQueue,
        rng: &mut R,
    ) -> Result<Allocation> {
        let mut queue_after = queue.clone();

        let (name, from_keyword) = match queue_after.pop_front() {
            Some(keyword) => {
                let stem = keyword_stem(&keyword);
                let name = format!("{stem}.html");
                if is_reserved(&stem) || self.allocated.contains(&name) {
                    debug!(keyword = %keyword, "keyword reserved or already used this run, adding suffix");
                    (self.suffixed(&stem, &item.name, rng)?, true)
                } else {
                    (name, true)
                }
            }
            None => {
                let stem = sanitize_stem(&item.name);
                (self.suffixed(&stem, &item.name, rng)?, false)
            }
        };

        self.allocated.insert(name.clone());
        debug!(id = %item.id, original = %item.name, %name, from_keyword, "allocated name");

        Ok(Allocation {
            name,
            queue_after,
            from_keyword,
        })
    }

    /// Reserve a specific name, e.g. to restore a known output. Returns
    /// `false` if it was already handed out this run.
    pub fn reserve(&mut self, name: &str) -> bool {
        self.allocated.insert(name.to_string())
    }

    /// Return a reserved name after its item failed.
    pub fn release(&mut self, name: &str) {
        self.allocated.remove(name);
    }

    fn suffixed<R: Rng + ?Sized>(&self, stem: &str, original: &str, rng: &mut R) -> Result<String> {
        for _ in 0..MAX_SUFFIX_ATTEMPTS {
            let suffix: u16 = rng.gen_range(1000..=9999);
            let name = format!("{stem}-{suffix}.html");
            if !self.allocated.contains(&name) && !self.existing.contains(&name) {
                return Ok(name);
            }
        }
        Err(DriveSiteError::AllocationExhausted {
            original: original.to_string(),
            attempts: MAX_SUFFIX_ATTEMPTS,
        })
    }
}

/// Deterministic file stem from an original remote name.
///
/// Drops the extension, replaces spaces and path separators with `-`,
/// removes control characters and leading dots, and caps the length.
pub fn sanitize_stem(original: &str) -> String {
    let stem = strip_extension(original.trim());
    let sanitized: String = stem
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            ' ' | '/' | '\\' => '-',
            c => c,
        })
        .collect();
    finish_stem(&sanitized)
}

/// File stem for a keyword: the keyword itself, made path-safe.
pub fn keyword_stem(keyword: &str) -> String {
    let stem: String = keyword
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();
    finish_stem(&stem)
}

/// Stems whose plain `.html` name belongs to the site itself.
fn is_reserved(stem: &str) -> bool {
    stem.eq_ignore_ascii_case("index")
}

// A leading dot hides the file from the document listing.
fn finish_stem(stem: &str) -> String {
    let stem = stem.trim_start_matches('.');
    let mut end = stem.len().min(MAX_STEM_BYTES);
    while !stem.is_char_boundary(end) {
        end -= 1;
    }
    let stem = &stem[..end];
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Remove the last extension. Leading dots do not start an extension.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if !name[..i].trim_start_matches('.').is_empty() => &name[..i],
        _ => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivesite_shared::ItemKind;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn item(name: &str) -> RemoteItem {
        RemoteItem::new(format!("id-{name}"), name, ItemKind::PlainText)
    }

    fn is_suffixed(name: &str, stem: &str) -> bool {
        let Some(rest) = name.strip_prefix(&format!("{stem}-")) else {
            return false;
        };
        let Some(digits) = rest.strip_suffix(".html") else {
            return false;
        };
        digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn keywords_are_consumed_in_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut alloc = NameAllocator::default();
        let queue: KeywordQueue = ["alpha", "beta"].into_iter().collect();

        let a = alloc.allocate(&item("One.txt"), &queue, &mut rng).unwrap();
        assert_eq!(a.name, "alpha.html");
        assert!(a.from_keyword);
        assert_eq!(a.queue_after.len(), 1);

        let b = alloc.allocate(&item("Two.txt"), &a.queue_after, &mut rng).unwrap();
        assert_eq!(b.name, "beta.html");
        assert!(b.queue_after.is_empty());

        let c = alloc.allocate(&item("My Notes.txt"), &b.queue_after, &mut rng).unwrap();
        assert!(is_suffixed(&c.name, "My-Notes"), "got {}", c.name);
        assert!(!c.from_keyword);
    }

    #[test]
    fn allocate_does_not_mutate_input_queue() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut alloc = NameAllocator::default();
        let queue: KeywordQueue = ["alpha"].into_iter().collect();

        alloc.allocate(&item("x"), &queue, &mut rng).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn duplicate_keyword_gets_suffix() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut alloc = NameAllocator::default();
        let queue: KeywordQueue = ["alpha", "alpha"].into_iter().collect();

        let a = alloc.allocate(&item("a"), &queue, &mut rng).unwrap();
        let b = alloc.allocate(&item("b"), &a.queue_after, &mut rng).unwrap();
        assert_eq!(a.name, "alpha.html");
        assert!(is_suffixed(&b.name, "alpha"), "got {}", b.name);
    }

    #[test]
    fn names_are_unique_within_a_run() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut alloc = NameAllocator::default();
        let queue = KeywordQueue::default();
        let mut seen = HashSet::new();

        for _ in 0..500 {
            let a = alloc.allocate(&item("same name.txt"), &queue, &mut rng).unwrap();
            assert!(seen.insert(a.name));
        }
    }

    #[test]
    fn suffix_avoids_existing_documents() {
        // Every suffix except one is already on disk.
        let existing: Vec<String> = (1000..=9999)
            .filter(|n| *n != 4242)
            .map(|n| format!("doc-{n}.html"))
            .collect();
        let mut alloc = NameAllocator::new(existing);
        let mut rng = StdRng::seed_from_u64(5);

        match alloc.allocate(&item("doc.txt"), &KeywordQueue::default(), &mut rng) {
            Ok(a) => assert_eq!(a.name, "doc-4242.html"),
            Err(DriveSiteError::AllocationExhausted { attempts, .. }) => {
                assert_eq!(attempts, MAX_SUFFIX_ATTEMPTS)
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn exhausted_when_every_suffix_taken() {
        let existing: Vec<String> = (1000..=9999).map(|n| format!("doc-{n}.html")).collect();
        let mut alloc = NameAllocator::new(existing);
        let mut rng = StdRng::seed_from_u64(6);

        let err = alloc
            .allocate(&item("doc.txt"), &KeywordQueue::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, DriveSiteError::AllocationExhausted { .. }));
    }

    #[test]
    fn released_names_can_be_reused() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut alloc = NameAllocator::default();
        let queue: KeywordQueue = ["alpha"].into_iter().collect();

        let a = alloc.allocate(&item("a"), &queue, &mut rng).unwrap();
        alloc.release(&a.name);
        let b = alloc.allocate(&item("b"), &queue, &mut rng).unwrap();
        assert_eq!(b.name, "alpha.html");
    }

    #[test]
    fn reserved_name_is_not_reallocated() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut alloc = NameAllocator::default();
        assert!(alloc.reserve("alpha.html"));
        assert!(!alloc.reserve("alpha.html"));

        let queue: KeywordQueue = ["alpha"].into_iter().collect();
        let a = alloc.allocate(&item("a"), &queue, &mut rng).unwrap();
        assert!(is_suffixed(&a.name, "alpha"), "got {}", a.name);
    }

    #[test]
    fn index_keyword_never_yields_the_index_page() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut alloc = NameAllocator::default();
        let queue: KeywordQueue = ["index", "INDEX"].into_iter().collect();

        let a = alloc.allocate(&item("a"), &queue, &mut rng).unwrap();
        let b = alloc.allocate(&item("b"), &a.queue_after, &mut rng).unwrap();
        assert!(is_suffixed(&a.name, "index"), "got {}", a.name);
        assert!(is_suffixed(&b.name, "INDEX"), "got {}", b.name);
        assert!(a.from_keyword && b.from_keyword);
    }

    #[test]
    fn long_names_are_capped_on_char_boundaries() {
        let ascii = sanitize_stem(&format!("{}.txt", "x".repeat(300)));
        assert_eq!(ascii, "x".repeat(MAX_STEM_BYTES));

        // Two-byte characters: 201 bytes would split one.
        let accented = keyword_stem(&format!("a{}", "\u{e9}".repeat(150)));
        assert!(accented.len() <= MAX_STEM_BYTES);
        assert_eq!(accented.len(), MAX_STEM_BYTES - 1);
        assert!(accented.ends_with('\u{e9}'));
    }

    #[test]
    fn sanitize_is_deterministic() {
        assert_eq!(sanitize_stem("My Doc.txt"), "My-Doc");
        assert_eq!(sanitize_stem("a/b\\c d.html"), "a-b-c-d");
        assert_eq!(sanitize_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(sanitize_stem(".hidden"), "hidden");
        assert_eq!(sanitize_stem(".hidden notes.txt"), "hidden-notes");
        assert_eq!(sanitize_stem("Quarterly Report"), "Quarterly-Report");
        assert_eq!(sanitize_stem("tab\there.txt"), "tabhere");
        assert_eq!(sanitize_stem(".."), "document");
        assert_eq!(sanitize_stem(""), "document");
        assert_eq!(sanitize_stem("My Doc.txt"), sanitize_stem("My Doc.txt"));
    }

    #[test]
    fn keyword_stem_is_path_safe() {
        assert_eq!(keyword_stem("reading glasses"), "reading glasses");
        assert_eq!(keyword_stem("../etc/passwd"), "-etc-passwd");
        assert_eq!(keyword_stem(".profile"), "profile");
        assert_eq!(keyword_stem(".."), "document");
    }
}

#![no_main]

//! Renders two byte-driven trees in sequence and checks that applying the
//! diff to a surface reproduces the second tree exactly.

use libfuzzer_sys::fuzz_target;
use std::collections::HashSet;
use surface::{MemorySurface, Surface};
use url::Url;
use vdom::builder::{element, keyed_text, text};
use vdom::dom_snapshot::{DomSnapshotOptions, compare_trees};
use vdom::{IdAllocator, Node, NodeId, align, diff};

const TAGS: [&str; 4] = ["div", "span", "ul", "li"];
const MAX_DEPTH: usize = 4;
const MAX_NODES: usize = 64;

struct Input<'a> {
    bytes: &'a [u8],
    used: HashSet<u8>,
    nodes: usize,
}

impl<'a> Input<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            used: HashSet::new(),
            nodes: 0,
        }
    }

    fn byte(&mut self) -> u8 {
        match self.bytes.split_first() {
            Some((&b, rest)) => {
                self.bytes = rest;
                b
            }
            None => 0,
        }
    }

    /// Keys come from a small pool so consecutive trees share identities.
    fn key(&mut self) -> Option<String> {
        let b = self.byte();
        if b & 0x80 == 0 {
            return None;
        }
        let slot = b & 0x1f;
        self.used.insert(slot).then(|| format!("k{slot}"))
    }

    fn node(&mut self, depth: usize) -> Node<u8> {
        self.nodes += 1;
        let b = self.byte();
        let key = self.key();
        if b & 1 == 0 || depth >= MAX_DEPTH {
            let label = format!("t{}", b >> 5);
            return match key {
                Some(key) => keyed_text(key, label),
                None => text(label),
            };
        }

        let mut el = element(TAGS[usize::from(b >> 1) % TAGS.len()]);
        if let Some(key) = key {
            el = el.key(key);
        }
        if b & 0x10 != 0 {
            el = el.attr("class", format!("c{}", b >> 6));
        }
        if b & 0x20 != 0 {
            el = el.on("click", b >> 6);
        }
        let count = usize::from(self.byte() % 4);
        for _ in 0..count {
            if self.nodes >= MAX_NODES {
                break;
            }
            el = el.child(self.node(depth + 1));
        }
        el.build()
    }

    fn root(&mut self) -> Node<u8> {
        self.used.clear();
        self.nodes = 0;
        let mut root = element("main").key("root");
        let count = usize::from(self.byte() % 6);
        for _ in 0..count {
            root = root.child(self.node(1));
        }
        root.build()
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(start) = Url::parse("https://fuzz.test/") else {
        return;
    };
    let mut input = Input::new(data);
    let mut ids = IdAllocator::new();
    let mut surface = MemorySurface::new(start);

    let first = align(None, input.root(), &mut ids);
    if surface.render_initial(&first).is_err() {
        panic!("initial render rejected");
    }

    let mut live = first;
    for _ in 0..3 {
        let next = align(Some(&live), input.root(), &mut ids);
        for patch in diff(&live, &next) {
            if let Err(error) = surface.apply_patch(&patch) {
                panic!("{} rejected: {error}\nlive: {live:?}\nnext: {next:?}", patch.label());
            }
        }
        let Ok(materialized) = surface.materialize() else {
            panic!("surface lost its root");
        };
        let strict = DomSnapshotOptions {
            ignore_ids: false,
            ignore_handler_ids: false,
        };
        if let Err(mismatch) = compare_trees(&next, &materialized, strict) {
            panic!("{mismatch}");
        }
        assert_eq!(surface.root(), Some(&NodeId::keyed("root")));
        live = next;
    }
});

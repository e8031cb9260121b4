use proptest::prelude::*;
use surface::{DocumentHost, MemorySurface, Surface};
use url::Url;
use vdom::builder::{element, keyed_text, text};
use vdom::dom_snapshot::{DomSnapshotOptions, compare_trees};
use vdom::{Attribute, IdAllocator, Node, NodeId, Patch, align, diff};

const POOL: usize = 64;

#[derive(Clone, Debug, PartialEq)]
enum Msg {
    Click(u8),
}

#[derive(Clone, Debug)]
enum Shape {
    Text {
        value: String,
        keyed: bool,
    },
    Element {
        tag: &'static str,
        keyed: bool,
        anchor: bool,
        class: Option<u8>,
        click: Option<u8>,
        children: Vec<Shape>,
    },
}

fn shape(keyed: impl Strategy<Value = bool> + Clone + 'static) -> impl Strategy<Value = Shape> {
    let leaf =
        ("[a-c]{0,3}", keyed.clone()).prop_map(|(value, keyed)| Shape::Text { value, keyed });
    leaf.prop_recursive(4, 32, 4, move |inner| {
        (
            prop::sample::select(vec!["div", "span", "ul"]),
            keyed.clone(),
            any::<bool>(),
            prop::option::of(0u8..3),
            prop::option::of(0u8..2),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(tag, keyed, anchor, class, click, children)| Shape::Element {
                tag,
                keyed,
                anchor,
                class,
                click,
                children,
            })
    })
}

fn page() -> impl Strategy<Value = (Vec<Shape>, Vec<usize>)> {
    (
        prop::collection::vec(shape(Just(true)), 0..5),
        Just((0..POOL).collect::<Vec<_>>()).prop_shuffle(),
    )
}

/// Pages where any node may come without a key and is matched by position.
fn mixed_page() -> impl Strategy<Value = (Vec<Shape>, Vec<usize>)> {
    (
        prop::collection::vec(shape(any::<bool>()), 0..5),
        Just((0..POOL).collect::<Vec<_>>()).prop_shuffle(),
    )
}

struct Keys {
    shuffled: std::vec::IntoIter<usize>,
    overflow: usize,
}

impl Keys {
    fn new(shuffled: Vec<usize>) -> Self {
        Self {
            shuffled: shuffled.into_iter(),
            overflow: POOL,
        }
    }

    fn next(&mut self) -> String {
        let n = self.shuffled.next().unwrap_or_else(|| {
            self.overflow += 1;
            self.overflow
        });
        format!("k{n}")
    }
}

fn build(shape: &Shape, keys: &mut Keys) -> Node<Msg> {
    match shape {
        Shape::Text { value, keyed: true } => keyed_text(keys.next(), value.as_str()),
        Shape::Text {
            value,
            keyed: false,
        } => text(value.as_str()),
        Shape::Element {
            tag,
            keyed,
            anchor,
            class,
            click,
            children,
        } => {
            let mut builder = element(*tag);
            if *keyed {
                builder = builder.key(keys.next());
            }
            if *anchor {
                builder = builder.attr("id", "anchor");
            }
            if let Some(class) = class {
                builder = builder.attr("class", format!("c{class}"));
            }
            if let Some(click) = click {
                builder = builder.on("click", Msg::Click(*click));
            }
            builder
                .children(children.iter().map(|child| build(child, keys)))
                .build()
        }
    }
}

fn body(children: &[Shape], shuffled: Vec<usize>) -> Node<Msg> {
    let mut keys = Keys::new(shuffled);
    element("body")
        .key("root")
        .children(children.iter().map(|child| build(child, &mut keys)))
        .build()
}

fn strict() -> DomSnapshotOptions {
    DomSnapshotOptions {
        ignore_ids: false,
        ignore_handler_ids: false,
    }
}

fn apply_batch(surface: &mut MemorySurface, patches: &[Patch<Msg>]) {
    let from = surface.version();
    for patch in patches {
        surface.apply_patch(patch).expect("apply");
    }
    surface.bump_version(from, from.next()).expect("bump");
}

fn start() -> Url {
    Url::parse("https://app.test/").expect("url")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn applying_diff_reproduces_new_tree(
        (old_shape, old_keys) in page(),
        (new_shape, new_keys) in page(),
    ) {
        let mut ids = IdAllocator::new();
        let old = align(None, body(&old_shape, old_keys), &mut ids);
        let new = align(None, body(&new_shape, new_keys), &mut ids);

        let mut surface = MemorySurface::new(start());
        surface.render_initial(&old).expect("render");
        apply_batch(&mut surface, &diff(&old, &new));

        let live = surface.materialize().expect("materialize");
        if let Err(mismatch) = compare_trees(&new, &live, strict()) {
            prop_assert!(false, "{}", mismatch);
        }
    }

    #[test]
    fn aligned_render_sequence_stays_in_sync(renders in prop::collection::vec(page(), 1..5)) {
        let mut ids = IdAllocator::new();
        let mut surface = MemorySurface::new(start());
        let mut live = align(None, element::<Msg>("body").key("root").build(), &mut ids);
        surface.render_initial(&live).expect("render");

        for (shape, keys) in renders {
            let next = align(Some(&live), body(&shape, keys), &mut ids);
            apply_batch(&mut surface, &diff(&live, &next));
            live = next;
        }

        let materialized = surface.materialize().expect("materialize");
        if let Err(mismatch) = compare_trees(&live, &materialized, strict()) {
            prop_assert!(false, "{}", mismatch);
        }
    }

    #[test]
    fn unkeyed_render_sequence_stays_in_sync(renders in prop::collection::vec(mixed_page(), 1..6)) {
        let mut ids = IdAllocator::new();
        let mut surface = MemorySurface::new(start());
        let mut live = align(None, element::<Msg>("body").key("root").build(), &mut ids);
        surface.render_initial(&live).expect("render");

        for (shape, keys) in renders {
            let next = align(Some(&live), body(&shape, keys), &mut ids);
            apply_batch(&mut surface, &diff(&live, &next));
            let materialized = surface.materialize().expect("materialize");
            if let Err(mismatch) = compare_trees(&next, &materialized, strict()) {
                prop_assert!(false, "{}", mismatch);
            }
            live = next;
        }
    }
}

fn card(anchored: bool) -> Node<Msg> {
    let mut label = element("span").child(text("hello"));
    if anchored {
        label = label.attr("id", "ignored");
    }
    element("div").key("root").child(label).build()
}

#[test]
fn identity_attribute_follows_presence_across_renders() {
    let mut ids = IdAllocator::new();
    let mut surface = MemorySurface::new(start());
    let mut live = align(None, card(false), &mut ids);
    surface.render_initial(&live).expect("render");

    for anchored in [true, false, true] {
        let next = align(Some(&live), card(anchored), &mut ids);
        assert_eq!(next.children()[0].id(), live.children()[0].id());
        apply_batch(&mut surface, &diff(&live, &next));

        let materialized = surface.materialize().expect("materialize");
        if let Err(mismatch) = compare_trees(&next, &materialized, strict()) {
            panic!("{mismatch}");
        }
        let span = &materialized.children()[0];
        let identity = Attribute::plain("id", span.id().to_string());
        assert_eq!(span.attributes().contains(&identity), anchored);
        live = next;
    }
}

fn nav(items: &[&str]) -> Node<Msg> {
    element("ul")
        .key("nav")
        .children(items.iter().map(|key| {
            let label = keyed_text(format!("{key}-label"), *key);
            element("li")
                .key(*key)
                .child(element("a").attr("href", format!("/{key}")).child(label))
        }))
        .build()
}

#[test]
fn nav_login_swaps_items_without_touching_home() {
    let mut ids = IdAllocator::new();
    let guest = align(None, nav(&["nav-home", "nav-login", "nav-register"]), &mut ids);
    let member = align(
        Some(&guest),
        nav(&["nav-home", "nav-editor", "nav-settings", "nav-profile-jake"]),
        &mut ids,
    );

    let patches = diff(&guest, &member);
    let removed: Vec<&NodeId> = patches
        .iter()
        .filter_map(|p| match p {
            Patch::RemoveChild { child, .. } => Some(child.id()),
            _ => None,
        })
        .collect();
    let added: Vec<&NodeId> = patches
        .iter()
        .filter_map(|p| match p {
            Patch::AddChild { child, .. } => Some(child.id()),
            _ => None,
        })
        .collect();
    assert_eq!(
        removed,
        vec![&NodeId::keyed("nav-login"), &NodeId::keyed("nav-register")]
    );
    assert_eq!(
        added,
        vec![
            &NodeId::keyed("nav-editor"),
            &NodeId::keyed("nav-settings"),
            &NodeId::keyed("nav-profile-jake"),
        ]
    );

    let mut surface = MemorySurface::new(start());
    surface.render_initial(&guest).expect("render");
    let home_link = guest.children()[0].children()[0].id().clone();
    apply_batch(&mut surface, &patches);

    assert!(surface.contains(&home_link));
    let snapshot = surface.snapshot(strict()).expect("snapshot");
    let expected = vdom::dom_snapshot::DomSnapshot::new(&member, strict());
    assert_eq!(snapshot.render(), expected.render());
}

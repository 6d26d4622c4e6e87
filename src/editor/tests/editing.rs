use kurbo::Point;
use lopdf::Document;

use super::fake_editor;
use crate::config::Config;
use crate::editor::Editor;
use crate::export::flatten_page;
use crate::mosaic::is_mosaic_pixel;
use crate::pointer::PointerEvent;
use crate::surface::{PixelBounds, Surface, TRANSPARENT};
use crate::test_support::FakeDocSpec;
use crate::tool::Mode;

async fn two_page_editor() -> Editor {
    let mut editor = fake_editor(Config::default());
    editor
        .open_document(FakeDocSpec::uniform(2, 100, 80, [200, 200, 200]).to_bytes())
        .expect("document opens");
    editor.settle().await;
    editor
}

fn painted(surface: &Surface) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    for y in 0..surface.height() {
        for x in 0..surface.width() {
            if surface.pixel(x, y) != Some(TRANSPARENT) {
                out.push((x, y));
            }
        }
    }
    out
}

#[tokio::test]
async fn stamped_drag_is_exported_over_the_page_render() {
    let mut editor = two_page_editor().await;
    editor.set_mode(Mode::Stamp);
    editor
        .drag(0, Point::new(50.0, 50.0), Point::new(80.0, 50.0), 3)
        .expect("drag on a provisioned page");

    let overlay = editor.pages()[0].overlay();
    let painted = painted(overlay);
    assert!(!painted.is_empty());
    for (x, y) in &painted {
        assert!((40..90).contains(x) && (40..60).contains(y), "({x}, {y})");
        assert!(overlay.pixel(*x, *y).is_some_and(is_mosaic_pixel));
    }
    assert!(editor.pages()[1].overlay().is_fully_transparent());

    let flattened = flatten_page(&editor.pages()[0]).expect("page flattens");
    let base = editor.pages()[0].base();
    for y in 0..flattened.height() {
        for x in 0..flattened.width() {
            let expected = overlay
                .pixel(x, y)
                .filter(|pixel| *pixel != TRANSPARENT)
                .or(base.pixel(x, y));
            assert_eq!(Some(*flattened.get_pixel(x, y)), expected);
        }
    }
    let untouched = flatten_page(&editor.pages()[1]).expect("page flattens");
    assert_eq!(&untouched, editor.pages()[1].base().image());

    let writer = editor.default_writer();
    let report = editor.export(&writer).await.expect("export succeeds");
    assert_eq!(report.exported_pages, vec![0, 1]);
    let doc = Document::load_mem(&report.bytes).expect("exported document reloads");
    assert_eq!(doc.get_pages().len(), 2);
}

#[tokio::test]
async fn erasing_restores_the_page_render() {
    let mut editor = two_page_editor().await;
    editor.set_mode(Mode::Stamp);
    editor
        .drag(0, Point::new(50.0, 50.0), Point::new(80.0, 50.0), 3)
        .expect("stamp drag");
    assert!(!editor.pages()[0].overlay().is_fully_transparent());

    editor.set_mode(Mode::Erase);
    editor
        .pointer_event(0, PointerEvent::down(38.0, 48.0))
        .expect("erase down");
    for x in [38.0, 48.0, 58.0, 68.0] {
        editor
            .pointer_event(0, PointerEvent::moved(x, 48.0))
            .expect("erase move");
    }
    editor.pointer_event(0, PointerEvent::up()).expect("erase up");

    let page = &editor.pages()[0];
    assert!(page.overlay().is_fully_transparent());
    let flattened = flatten_page(page).expect("page flattens");
    assert_eq!(&flattened, page.base().image());
}

#[tokio::test]
async fn mode_switch_applies_to_the_next_move_of_a_drag() {
    let mut editor = two_page_editor().await;
    editor.set_mode(Mode::Stamp);
    editor
        .pointer_event(0, PointerEvent::down(50.0, 50.0))
        .expect("down");
    let stamped = editor
        .pointer_event(0, PointerEvent::moved(60.0, 50.0))
        .expect("move");
    assert_eq!(
        stamped,
        Some(PixelBounds {
            x0: 40,
            y0: 40,
            x1: 60,
            y1: 60
        })
    );

    editor.set_mode(Mode::Erase);
    let erased = editor
        .pointer_event(0, PointerEvent::moved(70.0, 50.0))
        .expect("move");
    assert_eq!(
        erased,
        Some(PixelBounds {
            x0: 62,
            y0: 42,
            x1: 82,
            y1: 62
        })
    );
    let overlay = editor.pages()[0].overlay();
    assert!(overlay.pixel(45, 45).is_some_and(is_mosaic_pixel));
    assert!(overlay.pixel(59, 59).is_some_and(is_mosaic_pixel));

    editor.set_mode(Mode::None);
    let idle = editor
        .pointer_event(0, PointerEvent::moved(40.0, 50.0))
        .expect("move");
    assert_eq!(idle, None);
    assert_eq!(editor.mode(), Mode::None);
}

#[tokio::test]
async fn pages_keep_independent_drag_state() {
    let mut editor = two_page_editor().await;
    editor.set_mode(Mode::Stamp);
    editor
        .pointer_event(0, PointerEvent::down(30.0, 30.0))
        .expect("down on page 1");
    let other = editor
        .pointer_event(1, PointerEvent::moved(40.0, 30.0))
        .expect("move on page 2");

    assert_eq!(other, None);
    assert!(editor.pages()[1].overlay().is_fully_transparent());
    assert!(editor.pages()[0].pointer().is_some_and(|pointer| pointer.is_dragging()));
    assert!(!editor.pages()[1].pointer().is_some_and(|pointer| pointer.is_dragging()));
}

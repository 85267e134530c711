//! Any `Debug` value, pretty-printed and compared as text

use std::fmt::Debug;

use refsnap::{Pullback, SnapshottingExt};

use crate::lines::Lines;

/// [`Lines`] pulled back through `{:#?}`.
pub type Dump<V> = Pullback<Lines, fn(V) -> String, String>;

/// Snapshot a value through its pretty `Debug` output.
pub fn dump<V: Debug>() -> Dump<V> {
    Lines.pullback(pretty_debug::<V> as fn(V) -> String)
}

fn pretty_debug<V: Debug>(value: V) -> String {
    format!("{:#?}\n", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use refsnap::Snapshotting;

    #[derive(Debug)]
    #[allow(dead_code)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn test_dump_uses_pretty_debug() {
        let strategy = dump::<Point>();
        let rendered = resolve(strategy.render(Point { x: 1, y: -2 }));
        assert_eq!(rendered, "Point {\n    x: 1,\n    y: -2,\n}\n");
        assert_eq!(Snapshotting::<Point>::path_extension(&strategy), Some("txt"));
    }

    fn resolve(rendering: refsnap::Rendering<String>) -> String {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(rendering.into_future())
            .unwrap()
    }
}

//! Plain-text report: units ranked by fan-out, with the symbols behind
//! every edge.

use crate::deps::DependencySource;
use crate::frontend::{Frontend, UnitId};

/// How the ranked report is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedOptions {
    /// Order units by ascending fan-out. Ties keep unit order.
    pub sorted: bool,
    /// Maximum width of a symbol list before it is cut with `...`.
    pub width: usize,
}

impl Default for RankedOptions {
    fn default() -> Self {
        Self {
            sorted: true,
            width: 70,
        }
    }
}

pub fn render_ranked<F: Frontend + ?Sized>(
    source: &mut DependencySource<'_, F>,
    options: &RankedOptions,
) -> String {
    let frontend = source.frontend();
    let mut order: Vec<UnitId> = frontend.unit_ids();
    if options.sorted {
        let mut keyed: Vec<(usize, UnitId)> = order
            .into_iter()
            .map(|unit| (source.get(unit).fan_out(), unit))
            .collect();
        keyed.sort_by_key(|(fan_out, _)| *fan_out);
        order = keyed.into_iter().map(|(_, unit)| unit).collect();
    }

    let mut lines = Vec::new();
    for unit in order {
        let deps = source.get(unit);
        lines.push(format!(
            "File {} has {} dependencies",
            frontend.unit(unit).path.display(),
            deps.fan_out()
        ));
        for (target, names) in deps.iter() {
            lines.push(format!(
                " * {}: {}",
                frontend.unit(target).path.display(),
                truncate(&names.join(", "), options.width)
            ));
        }
    }
    lines.join("\n")
}

/// Cut `text` to `width` characters, the last three being `...`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::testing::CountingFrontend;
    use crate::frontend::{NodeCategory, Program, ProgramBuilder};
    use pretty_assertions::assert_eq;

    /// `busy` uses two symbols of `a` and one of `b`; `a` uses one of `b`.
    fn program() -> Program {
        let mut builder = ProgramBuilder::new("/p");
        let busy = builder.add_unit("/p/busy.ts", false);
        let a = builder.add_unit("/p/a.ts", false);
        let b = builder.add_unit("/p/b.ts", false);

        let declared = |builder: &mut ProgramBuilder, name: &str, unit: UnitId| {
            let symbol = builder.add_symbol(name);
            builder.declare(symbol, unit, 1);
            symbol
        };
        let one = declared(&mut builder, "one", a);
        let two = declared(&mut builder, "two", a);
        let three = declared(&mut builder, "three", b);

        for (unit, symbols) in [(busy, vec![one, three, two]), (a, vec![three])] {
            let root = builder.root(unit);
            for symbol in symbols {
                let node = builder.add_node(root, "identifier", NodeCategory::Other);
                builder.bind(node, symbol);
            }
        }
        builder.build()
    }

    #[test]
    fn test_sorted_report() {
        let program = program();
        let mut source = DependencySource::new(&program, true);
        let report = render_ranked(&mut source, &RankedOptions::default());

        assert_eq!(
            report,
            "File /p/b.ts has 0 dependencies\n\
             File /p/a.ts has 1 dependencies\n \
             * /p/b.ts: three\n\
             File /p/busy.ts has 2 dependencies\n \
             * /p/a.ts: one, two\n \
             * /p/b.ts: three"
        );
    }

    #[test]
    fn test_unsorted_keeps_unit_order() {
        let program = program();
        let mut source = DependencySource::new(&program, false);
        let options = RankedOptions {
            sorted: false,
            width: 70,
        };
        let report = render_ranked(&mut source, &options);
        let headers: Vec<&str> = report.lines().filter(|l| l.starts_with("File")).collect();

        assert_eq!(
            headers,
            vec![
                "File /p/busy.ts has 2 dependencies",
                "File /p/a.ts has 1 dependencies",
                "File /p/b.ts has 0 dependencies",
            ]
        );
    }

    #[test]
    fn test_sorting_walks_each_unit_once() {
        let program = program();
        let counting = CountingFrontend::new(&program);
        let mut cached = DependencySource::new(&counting, true);
        render_ranked(&mut cached, &RankedOptions::default());
        let with_cache = counting.children_calls();

        let counting = CountingFrontend::new(&program);
        let mut fresh = DependencySource::new(&counting, false);
        render_ranked(&mut fresh, &RankedOptions::default());

        assert_eq!(counting.children_calls(), with_cache * 2);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 70), "short");
        assert_eq!(truncate("abcdefghij", 10), "abcdefghij");
        assert_eq!(truncate("abcdefghijk", 10), "abcdefg...");
        assert_eq!(truncate("äöüäöü", 5), "äö...");
        assert_eq!(truncate("abcdef", 2), "...");
    }
}

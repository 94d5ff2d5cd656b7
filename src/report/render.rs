//! # Exposition text.
//!
//! [`render`] turns a [`Snapshot`] into Prometheus text format, one metric
//! family per counter:
//!
//! ```text
//! # HELP probevisor_reply The total number of replies received.
//! # TYPE probevisor_reply counter
//! probevisor_reply{name="n1",target="10.0.0.1:10250"} 4
//!
//! # HELP probevisor_lost The total number of replies not received.
//! ...
//! ```

use std::fmt::Write;

use bytes::Bytes;

use super::snapshot::{Counters, Snapshot};

/// Content type of a rendered report.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

struct Family {
    suffix: &'static str,
    help: &'static str,
    value: fn(&Counters) -> u64,
}

const FAMILIES: [Family; 3] = [
    Family {
        suffix: "reply",
        help: "The total number of replies received.",
        value: |c| c.reply,
    },
    Family {
        suffix: "lost",
        help: "The total number of replies not received.",
        value: |c| c.lost,
    },
    Family {
        suffix: "time",
        help: "The total number of milliseconds spent awaiting replies.",
        value: |c| c.time_ms,
    },
];

/// Renders `snapshot` with metric names prefixed by `prefix`.
pub fn render(snapshot: &Snapshot, prefix: &str) -> Bytes {
    let mut out = String::with_capacity(256 + snapshot.len() * 3 * 64);

    for (i, family) in FAMILIES.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let name = format!("{prefix}_{}", family.suffix);
        let _ = writeln!(out, "# HELP {name} {}", family.help);
        let _ = writeln!(out, "# TYPE {name} counter");
        for entry in snapshot.iter() {
            let _ = writeln!(
                out,
                "{name}{{name=\"{}\",target=\"{}\"}} {}",
                escape(&entry.target.name),
                escape(&entry.target.address),
                (family.value)(&entry.counters),
            );
        }
    }

    Bytes::from(out)
}

/// Escapes a label value (`\`, `"` and newline).
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Target;
    use crate::events::Event;
    use std::time::Duration;

    #[test]
    fn renders_every_family_per_target() {
        let mut snap = Snapshot::new();
        let n1 = Target::new("n1", "1.1.1.1:7");
        snap.record(&Event::reply(n1.clone(), Duration::from_millis(3)));
        snap.record(&Event::lost(n1));
        snap.record(&Event::reply(Target::directory("https://api"), Duration::from_millis(40)));

        let text = String::from_utf8(render(&snap, "pv").to_vec()).unwrap();
        let expected = "\
# HELP pv_reply The total number of replies received.
# TYPE pv_reply counter
pv_reply{name=\"API\",target=\"https://api\"} 1
pv_reply{name=\"n1\",target=\"1.1.1.1:7\"} 1

# HELP pv_lost The total number of replies not received.
# TYPE pv_lost counter
pv_lost{name=\"API\",target=\"https://api\"} 0
pv_lost{name=\"n1\",target=\"1.1.1.1:7\"} 1

# HELP pv_time The total number of milliseconds spent awaiting replies.
# TYPE pv_time counter
pv_time{name=\"API\",target=\"https://api\"} 40
pv_time{name=\"n1\",target=\"1.1.1.1:7\"} 3
";
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_snapshot_renders_headers_only() {
        let text = render(&Snapshot::new(), "pv");
        assert_eq!(text.iter().filter(|b| **b == b'\n').count(), 8);
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape(r#"a"b\c"#), r#"a\"b\\c"#);
        assert_eq!(escape("x\ny"), "x\\ny");
    }
}

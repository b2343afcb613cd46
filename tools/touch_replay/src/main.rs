use std::{
    env,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    process,
};

use touch_gestures::gesture_engine::{
    EventFlags, GestureEvent, GestureKind, GestureSequence, TouchEvent, TouchKind,
};

#[derive(Clone, Copy)]
enum ReplayRow {
    Touch(TouchEvent),
    Tick(u64),
}

impl ReplayRow {
    fn ms(&self) -> u64 {
        match self {
            Self::Touch(event) => event.t_ms,
            Self::Tick(ms) => *ms,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let mut trace_path: Option<PathBuf> = None;
    let mut expect_path: Option<PathBuf> = None;

    let mut idx = 1usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--expect" => {
                idx += 1;
                let Some(path) = args.get(idx) else {
                    return Err("missing path after --expect".into());
                };
                expect_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            value if value.starts_with('-') => {
                return Err(format!("unknown argument: {value}"));
            }
            value => {
                if trace_path.is_some() {
                    return Err("multiple trace paths provided".into());
                }
                trace_path = Some(PathBuf::from(value));
            }
        }
        idx += 1;
    }

    let trace_path = trace_path.ok_or_else(usage)?;
    let rows = parse_trace(&trace_path)?;

    let mut sequence = GestureSequence::new();
    let mut gestures: Vec<GestureEvent> = Vec::new();
    for row in &rows {
        let output = match row {
            ReplayRow::Touch(event) => sequence.process(event),
            ReplayRow::Tick(ms) => sequence.tick(*ms),
        };
        gestures.extend(output);
    }

    // Traces often stop right after the last touch; let a held point time out.
    if let Some(last_ms) = rows.last().map(ReplayRow::ms) {
        let tail_ms = last_ms
            .saturating_add(sequence.config().tap.long_press_ms)
            .saturating_add(1);
        gestures.extend(sequence.tick(tail_ms));
    }

    println!("gesture,ms,kind,x,y,count,a,b");
    for gesture in &gestures {
        let (a, b) = payload(gesture.kind);
        println!(
            "gesture,{},{},{},{},{},{},{}",
            gesture.t_ms,
            kind_label(gesture.kind),
            gesture.x,
            gesture.y,
            gesture.touch_count,
            a,
            b
        );
    }

    if let Some(expect_path) = expect_path {
        let expected = parse_expected_kinds(&expect_path)?;
        let actual: Vec<&'static str> = gestures.iter().map(|g| kind_label(g.kind)).collect();
        if actual != expected {
            eprintln!("expected kinds: {}", expected.join(","));
            eprintln!("actual kinds:   {}", actual.join(","));
            return Err("gesture sequence mismatch".into());
        }
    }

    Ok(())
}

fn usage() -> String {
    "usage: touch_replay <trace.csv> [--expect expected_kinds.txt]".to_string()
}

fn parse_trace(path: &Path) -> Result<Vec<ReplayRow>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out: Vec<ReplayRow> = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result
            .map_err(|e| format!("failed to read {}:{}: {e}", path.display(), line_no))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        match parts[0] {
            "tick" => {
                if parts.len() != 2 {
                    return Err(format!(
                        "{}:{} invalid tick line, expected 2 columns",
                        path.display(),
                        line_no
                    ));
                }
                out.push(ReplayRow::Tick(parse_u64(parts[1], path, line_no, "ms")?));
            }
            "touch" => {
                if parts.len() != 6 && parts.len() != 7 {
                    return Err(format!(
                        "{}:{} invalid touch line, expected 6 or 7 columns",
                        path.display(),
                        line_no
                    ));
                }
                let ms = parse_u64(parts[1], path, line_no, "ms")?;
                let id = parse_u8(parts[2], path, line_no, "id")?;
                let kind = parse_touch_kind(parts[3]).ok_or_else(|| {
                    format!(
                        "{}:{} invalid touch kind '{}'",
                        path.display(),
                        line_no,
                        parts[3]
                    )
                })?;
                let x = parse_i32(parts[4], path, line_no, "x")?;
                let y = parse_i32(parts[5], path, line_no, "y")?;
                let flags = match parts.get(6) {
                    Some(raw) => EventFlags::from_bits_truncate(parse_u32(
                        raw, path, line_no, "flags",
                    )?),
                    None => EventFlags::empty(),
                };
                out.push(ReplayRow::Touch(
                    TouchEvent::new(id, kind, x, y, ms).with_flags(flags),
                ));
            }
            // Header rows and other record types are skipped.
            _ => continue,
        }
    }

    Ok(out)
}

fn parse_touch_kind(raw: &str) -> Option<TouchKind> {
    match raw.to_ascii_lowercase().as_str() {
        "press" => Some(TouchKind::Press),
        "move" => Some(TouchKind::Move),
        "release" => Some(TouchKind::Release),
        "cancel" => Some(TouchKind::Cancel),
        _ => None,
    }
}

fn parse_expected_kinds(path: &Path) -> Result<Vec<&'static str>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let reader = BufReader::new(file);

    let mut kinds = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result
            .map_err(|e| format!("failed to read {}:{}: {e}", path.display(), line_no))?;
        let token = line.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }

        let normalized = normalize_kind(token).ok_or_else(|| {
            format!(
                "{}:{} invalid expected gesture kind: {}",
                path.display(),
                line_no,
                token
            )
        })?;
        kinds.push(normalized);
    }

    Ok(kinds)
}

const KIND_LABELS: [&str; 11] = [
    "tap_down",
    "click",
    "double_click",
    "long_press",
    "scroll_begin",
    "scroll_update",
    "scroll_end",
    "pinch_begin",
    "pinch_update",
    "pinch_end",
    "three_finger_swipe",
];

fn normalize_kind(kind: &str) -> Option<&'static str> {
    let kind = kind.trim().to_ascii_lowercase();
    KIND_LABELS.iter().copied().find(|label| *label == kind)
}

fn kind_label(kind: GestureKind) -> &'static str {
    match kind {
        GestureKind::TapDown => "tap_down",
        GestureKind::Click => "click",
        GestureKind::DoubleClick => "double_click",
        GestureKind::LongPress => "long_press",
        GestureKind::ScrollBegin => "scroll_begin",
        GestureKind::ScrollUpdate { .. } => "scroll_update",
        GestureKind::ScrollEnd { .. } => "scroll_end",
        GestureKind::PinchBegin { .. } => "pinch_begin",
        GestureKind::PinchUpdate { .. } => "pinch_update",
        GestureKind::PinchEnd { .. } => "pinch_end",
        GestureKind::ThreeFingerSwipe { .. } => "three_finger_swipe",
    }
}

fn payload(kind: GestureKind) -> (String, String) {
    match kind {
        GestureKind::ScrollUpdate { dx, dy } => (dx.to_string(), dy.to_string()),
        GestureKind::ScrollEnd {
            velocity_x,
            velocity_y,
        }
        | GestureKind::ThreeFingerSwipe {
            velocity_x,
            velocity_y,
        } => (format!("{velocity_x:.1}"), format!("{velocity_y:.1}")),
        GestureKind::PinchBegin { scale }
        | GestureKind::PinchUpdate { scale }
        | GestureKind::PinchEnd { scale } => {
            (format!("{scale:.3}"), "0".to_string())
        }
        _ => ("0".to_string(), "0".to_string()),
    }
}

fn parse_u64(raw: &str, path: &Path, line_no: usize, field: &str) -> Result<u64, String> {
    raw.trim().parse::<u64>().map_err(|e| {
        format!(
            "{}:{} invalid {} '{}': {}",
            path.display(),
            line_no,
            field,
            raw.trim(),
            e
        )
    })
}

fn parse_u32(raw: &str, path: &Path, line_no: usize, field: &str) -> Result<u32, String> {
    raw.trim().parse::<u32>().map_err(|e| {
        format!(
            "{}:{} invalid {} '{}': {}",
            path.display(),
            line_no,
            field,
            raw.trim(),
            e
        )
    })
}

fn parse_i32(raw: &str, path: &Path, line_no: usize, field: &str) -> Result<i32, String> {
    raw.trim().parse::<i32>().map_err(|e| {
        format!(
            "{}:{} invalid {} '{}': {}",
            path.display(),
            line_no,
            field,
            raw.trim(),
            e
        )
    })
}

fn parse_u8(raw: &str, path: &Path, line_no: usize, field: &str) -> Result<u8, String> {
    raw.trim().parse::<u8>().map_err(|e| {
        format!(
            "{}:{} invalid {} '{}': {}",
            path.display(),
            line_no,
            field,
            raw.trim(),
            e
        )
    })
}

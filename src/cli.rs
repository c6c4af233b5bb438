// src/cli.rs
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;
use std::{env, fs, thread, time::Duration};

use crate::api::{Request, Response, Session};
use crate::core::dom::Document;
use crate::csv::rows_to_string;
use crate::page;
use crate::store::{DEFAULT_STORE_DIR, PLAYER_HEADERS, Store};

#[derive(Clone)]
pub struct Params {
    pub input: Option<PathBuf>,   // page snapshot to format
    pub out: Option<PathBuf>,     // output path; default rewrites in place
    pub extract: bool,            // scrape page data into the store
    pub show: bool,               // print stored data, then exit
    pub clear: bool,              // clear stored data, then exit
    pub watch: bool,              // keep polling the snapshot for changes
    pub poll_ms: u64,             // watch poll cadence
    pub store_dir: PathBuf,
}

impl Params {
    pub fn new() -> Self {
        Self {
            input: None,
            out: None,
            extract: false,
            show: false,
            clear: false,
            watch: false,
            poll_ms: 250,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

pub fn parse_args() -> Result<Params, Box<dyn Error>> {
    let mut params = Params::new();
    let mut args = env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "-i" | "--in" => {
                params.input = Some(PathBuf::from(args.next().ok_or("Missing input path")?));
            }
            "-o" | "--out" => {
                params.out = Some(PathBuf::from(args.next().ok_or("Missing output path")?));
            }
            "-x" | "--extract" => params.extract = true,
            "--show" => params.show = true,
            "--clear" => params.clear = true,
            "--watch" => params.watch = true,
            "--poll" => {
                params.poll_ms = args.next().ok_or("Missing value for --poll")?.parse()?;
                if params.poll_ms == 0 {
                    return Err("--poll must be > 0".into());
                }
            }
            "--store" => {
                params.store_dir = PathBuf::from(args.next().ok_or("Missing store directory")?);
            }
            "-h" | "--help" => {
                eprintln!(include_str!("cli_help.txt"));
                std::process::exit(0);
            }
            _ => return Err(format!("Unknown arg: {}", a).into()),
        }
    }

    if params.input.is_none() && !params.show && !params.clear {
        return Err("Nothing to do. Specify --in <page.html>, --show or --clear.".into());
    }
    Ok(params)
}

pub fn run(params: Params) -> Result<(), Box<dyn Error>> {
    let store = Store::at(&params.store_dir);

    if params.clear {
        store.clear_data()?;
        println!("Store cleared.");
    }
    if params.show {
        print_stored(&store);
    }

    let Some(input) = params.input.clone() else {
        return Ok(());
    };

    let text = fs::read_to_string(&input)?;
    let mut session = Session::new(Document::parse(&text), store);
    session.runner.start(&mut session.doc);

    if params.extract {
        match session.handle(Request::RefreshData) {
            Response::Data(data) => {
                println!("Extracted {} player(s).", data.players.len());
            }
            Response::Failed(e) => return Err(e.into()),
            _ => {}
        }
    }

    let out = params.out.clone().unwrap_or_else(|| input.clone());
    write_output(&session.doc, &out)?;
    println!("Wrote {}", out.display());

    if params.watch {
        watch_loop(&mut session, &params, &input, &out)?;
    }
    Ok(())
}

/// Poll the snapshot file; a rewrite by the exporting browser shows up as
/// a changed mtime. Each change is replayed into the session document so
/// the runner's throttle decides when to reformat.
fn watch_loop(
    session: &mut Session,
    params: &Params,
    input: &Path,
    out: &Path,
) -> Result<(), Box<dyn Error>> {
    let mut last_seen = mtime(input);
    println!("Watching {} (poll {} ms, Ctrl-C to stop)...", input.display(), params.poll_ms);

    loop {
        thread::sleep(Duration::from_millis(params.poll_ms));
        let now = Instant::now();

        let current = mtime(input);
        if current.is_some() && current != last_seen {
            last_seen = current;
            let text = fs::read_to_string(input)?;
            session.doc = Document::new();
            let root = session.doc.root();
            session.doc.append_html(root, &text);

            if params.extract {
                let data = page::extract(&session.doc);
                let _ = session.store.save_data(&data);
            }
            if session.runner.on_change(&mut session.doc, now) {
                write_output(&session.doc, out)?;
                println!("Reformatted (change).");
            }
        }

        if session.runner.tick(&mut session.doc, Instant::now()) {
            write_output(&session.doc, out)?;
            println!("Reformatted (coalesced).");
        }
    }
}

fn mtime(path: &Path) -> Option<std::time::SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

fn write_output(doc: &Document, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, doc.to_html())?;
    Ok(())
}

fn print_stored(store: &Store) {
    let data = store.load_data();
    println!("team_value: {}", data.team_value.as_deref().unwrap_or("-"));
    println!("salary_cap: {}", data.salary_cap.as_deref().unwrap_or("-"));
    if let Some(ms) = data.last_updated_ms {
        println!("last_updated_ms: {}", ms);
    }

    if data.players.is_empty() {
        println!("(no players stored)");
        return;
    }
    let headers: Vec<String> = PLAYER_HEADERS.iter().map(|h| s!(*h)).collect();
    let rows: Vec<Vec<String>> = data
        .players
        .iter()
        .map(|p| {
            vec![
                p.name.clone(),
                p.salary.clone().unwrap_or_default(),
                p.position.clone().unwrap_or_default(),
                p.team.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print!("{}", rows_to_string(&rows, Some(&headers)));
}

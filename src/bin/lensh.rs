// lensh: Cypher-Lens Shell (optional CLI client)
// Build with: cargo build --features cli --bin lensh

use clap::{Arg, ArgAction, Command};
use rustyline::history::DefaultHistory;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use serde_json::Value;
use std::time::{Duration, Instant};
use tungstenite::{client::IntoClientRequest, connect, protocol::Message, Error as WsError, WebSocket};
use url::Url;

use cypher_lens::graph_utils::graph::{project_records_with_report, GraphElement, ProjectionFields};
use cypher_lens::graph_utils::table::ResultTable;
use cypher_lens::persistence::settings::AppSettings;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

struct View {
    format: Format,
    fields: ProjectionFields,
}

fn is_banner_msg(s: &str) -> bool {
    s.trim_start().starts_with("Cypher-Lens REPL ready.")
}

fn is_interrupted(e: &WsError) -> bool {
    match e {
        WsError::Io(ioe) => ioe.kind() == std::io::ErrorKind::Interrupted,
        _ => false,
    }
}

fn recv_message_with_retry<S: std::io::Read + std::io::Write>(sock: &mut WebSocket<S>, overall_timeout: Duration) -> Result<Message, WsError> {
    let start = Instant::now();
    loop {
        match sock.read() {
            Ok(m) => return Ok(m),
            Err(e) if is_interrupted(&e) => {
                // Retry on EINTR
                if start.elapsed() > overall_timeout { return Err(e); }
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}

fn send_text_with_retry<S: std::io::Read + std::io::Write>(sock: &mut WebSocket<S>, text: String, overall_timeout: Duration) -> Result<(), WsError> {
    let start = Instant::now();
    loop {
        match sock.send(Message::Text(text.clone())) {
            Ok(_) => return Ok(()),
            Err(e) if is_interrupted(&e) => {
                if start.elapsed() > overall_timeout { return Err(e); }
                continue;
            }
            Err(e) => return Err(e),
        }
    }
}

// Read frames until a non-banner reply arrives. No overall deadline: the server
// does not time queries out either.
fn read_reply<S: std::io::Read + std::io::Write>(sock: &mut WebSocket<S>) -> Result<String, WsError> {
    loop {
        match recv_message_with_retry(sock, Duration::from_secs(60))? {
            Message::Text(txt) => {
                if is_banner_msg(&txt) { continue; }
                return Ok(txt);
            }
            Message::Binary(b) => return Ok(String::from_utf8_lossy(&b).into_owned()),
            _ => { /* ignore pings/others */ }
        }
    }
}

fn main() {
    let matches = Command::new("lensh")
        .about("Cypher-Lens Shell — connect to a running Cypher-Lens REPL, run queries, view tables and graphs")
        .arg(Arg::new("host").long("host").default_value("127.0.0.1").help("Server host"))
        .arg(Arg::new("port").long("port").default_value("8787").help("Server port"))
        .arg(Arg::new("eval").short('e').long("eval").value_name("QUERY").help("Run a single query and exit"))
        .arg(Arg::new("format").long("format").value_parser(["text", "json"]).default_value("text").help("Render records/graph as text, or print the raw JSON reply plus graph elements"))
        .arg(Arg::new("start").long("start").value_name("ALIAS").help("Column holding the start node (default n)"))
        .arg(Arg::new("rel").long("rel").value_name("ALIAS").help("Column holding the relationship (default r)"))
        .arg(Arg::new("end").long("end").value_name("ALIAS").help("Column holding the end node (default m)"))
        .arg(Arg::new("quiet").short('q').long("quiet").action(ArgAction::SetTrue).help("Suppress banner/help text"))
        .get_matches();

    let host = matches.get_one::<String>("host").cloned().unwrap_or_else(|| "127.0.0.1".into());
    let port = matches.get_one::<String>("port").cloned().unwrap_or_else(|| "8787".into());
    let eval = matches.get_one::<String>("eval").cloned();
    let quiet = matches.get_flag("quiet");

    let settings = AppSettings::load().unwrap_or_default();
    let mut fields = settings.projection.clone();
    if let Some(s) = matches.get_one::<String>("start") { fields.start = s.clone(); }
    if let Some(r) = matches.get_one::<String>("rel") { fields.relationship = r.clone(); }
    if let Some(e) = matches.get_one::<String>("end") { fields.end = e.clone(); }
    let format = match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => Format::Json,
        _ => Format::Text,
    };
    let view = View { format, fields };

    let endpoint = format!("ws://{}:{}/api/repl", host, port);
    let url = match Url::parse(&endpoint) {
        Ok(u) => u,
        Err(e) => {
            eprintln!("invalid URL '{}': {}", endpoint, e);
            std::process::exit(1);
        }
    };
    let req = match url.into_client_request() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("failed to create client request: {}", e);
            std::process::exit(1);
        }
    };

    let (mut socket, _resp) = match connect(req) {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!(
                "Failed to connect: {}\nHint: Ensure Cypher-Lens is running (default 127.0.0.1:8787).",
                e
            );
            std::process::exit(2);
        }
    };

    // The server greets with a banner on connect; consume it so the first
    // query's reply isn't mistaken for it.
    let _ = recv_message_with_retry(&mut socket, Duration::from_secs(2));

    // One-off eval mode
    if let Some(query) = eval {
        if let Err(e) = send_text_with_retry(&mut socket, query, Duration::from_secs(5)) {
            eprintln!("send error: {}", e);
            std::process::exit(3);
        }
        match read_reply(&mut socket) {
            Ok(txt) => {
                if !print_response(&txt, &view) { std::process::exit(4); }
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                std::process::exit(3);
            }
        }
        return;
    }

    // Interactive mode with history
    let mut rl: Editor<(), DefaultHistory> = match Editor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("failed to initialize editor: {}", e);
            std::process::exit(1);
        }
    };
    let mut hist_path = AppSettings::settings_dir();
    hist_path.push("lensh_history.txt");
    let _ = std::fs::create_dir_all(hist_path.parent().unwrap_or_else(|| std::path::Path::new(".")));
    let _ = rl.load_history(&hist_path);

    if !quiet {
        eprintln!(
            "Connected to {}.\nType queries and press Enter. Commands: :help, quit / exit. History saved at {}.\n",
            endpoint,
            hist_path.display()
        );
    }

    loop {
        match rl.readline("lensh> ") {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() { continue; }
                if input == ":quit" || input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") { break; }
                if input == ":help" || input == "?" {
                    println!(
                        "Commands:\n  :help or ?    Show this help\n  :quit         Exit lensh\nNotes:\n  - Use Up/Down to navigate history.\n  - The graph view reads columns {}, {}, {}.",
                        view.fields.start, view.fields.relationship, view.fields.end
                    );
                    continue;
                }
                rl.add_history_entry(input).ok();

                if let Err(e) = send_text_with_retry(&mut socket, input.to_string(), Duration::from_secs(5)) {
                    eprintln!("send error: {}", e);
                    break;
                }
                match read_reply(&mut socket) {
                    Ok(txt) => { print_response(&txt, &view); }
                    Err(e) => {
                        eprintln!("read error: {}", e);
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => { // Ctrl-C
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => { // Ctrl-D
                break;
            }
            Err(e) => {
                eprintln!("readline error: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);
}

// Returns false when the server reported an error
fn print_response(s: &str, view: &View) -> bool {
    let v: Value = match serde_json::from_str(s) {
        Ok(v) => v,
        Err(_) => {
            println!("{}", s);
            return true;
        }
    };
    if let Some(err) = v.get("error").and_then(Value::as_str) {
        eprintln!("Error: {}", err);
        return false;
    }
    let records: Vec<Value> = v.get("records").and_then(Value::as_array).cloned().unwrap_or_default();
    let projection = project_records_with_report(&records, &view.fields);

    match view.format {
        Format::Json => {
            let out = serde_json::json!({ "records": records, "elements": projection.elements });
            match serde_json::to_string_pretty(&out) {
                Ok(p) => println!("{}", p),
                Err(_) => println!("{}", s),
            }
        }
        Format::Text => {
            println!("{}", ResultTable::from_records(&records).render_text());
            println!();
            println!("{}", render_graph(&projection.elements));
            if !projection.skipped.is_empty() {
                eprintln!("({} of {} records not drawn)", projection.skipped.len(), records.len());
            }
        }
    }
    true
}

fn render_graph(elements: &[GraphElement]) -> String {
    if elements.is_empty() {
        return "No graph to display.".to_string();
    }
    let mut lines = Vec::with_capacity(elements.len());
    for el in elements {
        match el {
            GraphElement::Node(n) => lines.push(format!("({}:{})", n.id, n.label)),
            GraphElement::Edge(e) => lines.push(format!("{} -[{}]-> {}", e.source, e.label, e.target)),
        }
    }
    lines.join("\n")
}

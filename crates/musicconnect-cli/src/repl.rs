use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use console::Term;
use musicconnect_core::{load_config, share_text, ActionOutcome, Session};
use musicconnect_schema::{DetailField, TargetGroup};

use crate::ui;

const HELP: &str = "\
groups                  รายชื่อกลุ่มเป้าหมาย
discover <group>        สร้างไอเดียสำหรับกลุ่มเป้าหมาย (id หรือหมายเลข)
more                    โหลดไอเดียเพิ่มเติม
ideas                   แสดงไอเดียปัจจุบัน
view <n>                สร้างข้อเสนอโครงการจากไอเดียลำดับที่ n
custom <text>           สร้างข้อเสนอโครงการจากคำขอของคุณเอง
refine <instruction>    ให้ AI ปรับแก้ข้อเสนอโครงการที่เปิดอยู่
show                    แสดงข้อเสนอโครงการที่เปิดอยู่
edit                    เริ่มแก้ไขด้วยตนเอง
set <field> <value>     แก้ไขฟิลด์ (รายการคั่นด้วย ;)
save | cancel           ยืนยัน / ยกเลิกการแก้ไข
toggle                  บันทึก / ยกเลิกการบันทึก
saved                   รายการที่บันทึกไว้
open <id|n>             เปิดรายการที่บันทึกไว้
delete <id|n>           ลบรายการที่บันทึกไว้
share                   ข้อความสำหรับแชร์
close                   ปิดข้อเสนอโครงการ
help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Groups,
    Discover(TargetGroup),
    More,
    Ideas,
    View(usize),
    Custom(String),
    Refine(String),
    Show,
    Edit,
    Set(DetailField, String),
    Save,
    Cancel,
    Toggle,
    Saved,
    Open(String),
    Delete(String),
    Share,
    Close,
    Help,
    Quit,
}

fn parse_group(raw: &str) -> Result<TargetGroup> {
    if let Ok(n) = raw.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| TargetGroup::ALL.get(i).copied())
            .ok_or_else(|| anyhow!("no group numbered {n}"));
    }
    TargetGroup::from_str(raw)
}

fn require<'a>(arg: &'a str, usage: &str) -> Result<&'a str> {
    if arg.is_empty() {
        bail!("usage: {usage}");
    }
    Ok(arg)
}

pub fn parse_command(line: &str) -> Result<ReplCommand> {
    let line = line.trim();
    let (name, rest) = line
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((line, ""));

    let command = match name {
        "groups" => ReplCommand::Groups,
        "discover" => ReplCommand::Discover(parse_group(require(rest, "discover <group>")?)?),
        "more" => ReplCommand::More,
        "ideas" => ReplCommand::Ideas,
        "view" => {
            let n: usize = require(rest, "view <n>")?
                .parse()
                .map_err(|_| anyhow!("usage: view <n>"))?;
            let index = n.checked_sub(1).ok_or_else(|| anyhow!("ideas are numbered from 1"))?;
            ReplCommand::View(index)
        }
        // Blank text is left for the session to reject.
        "custom" => ReplCommand::Custom(rest.to_string()),
        "refine" => ReplCommand::Refine(rest.to_string()),
        "show" => ReplCommand::Show,
        "edit" => ReplCommand::Edit,
        "set" => {
            let args = require(rest, "set <field> <value>")?;
            let (field, value) = args
                .split_once(char::is_whitespace)
                .map(|(field, value)| (field, value.trim()))
                .unwrap_or((args, ""));
            ReplCommand::Set(field.parse()?, value.to_string())
        }
        "save" => ReplCommand::Save,
        "cancel" => ReplCommand::Cancel,
        "toggle" => ReplCommand::Toggle,
        "saved" => ReplCommand::Saved,
        "open" => ReplCommand::Open(require(rest, "open <id|n>")?.to_string()),
        "delete" => ReplCommand::Delete(require(rest, "delete <id|n>")?.to_string()),
        "share" => ReplCommand::Share,
        "close" => ReplCommand::Close,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => bail!("unknown command: {other} (type 'help')"),
    };
    Ok(command)
}

/// Resolves a 1-based position in the saved list to its id; other input is taken as an id.
fn resolve_saved_id(session: &Session, raw: &str) -> String {
    raw.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| session.store().list().get(i))
        .map(|item| item.id.clone())
        .unwrap_or_else(|| raw.to_string())
}

fn report_ideas(term: &Term, session: &Session, outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Rejected(err) => ui::print_error(term, &err.to_string()),
        _ => ui::print_block(term, &ui::format_ideas(session)),
    }
}

fn report_detail(term: &Term, session: &Session, outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Rejected(err) => ui::print_error(term, &err.to_string()),
        _ => match session.detail_view() {
            Some(view) => ui::print_block(
                term,
                &ui::format_detail_view(view, session.is_displayed_saved()),
            ),
            None => {
                if let Some(err) = session.custom_error() {
                    ui::print_error(term, err);
                }
            }
        },
    }
}

fn show_detail(term: &Term, session: &Session) {
    report_detail(term, session, ActionOutcome::Applied);
}

/// Runs one command; returns `false` when the REPL should exit.
async fn dispatch(term: &Term, session: &mut Session, command: ReplCommand) -> Result<bool> {
    match command {
        ReplCommand::Groups => ui::print_block(term, &ui::format_groups()),
        ReplCommand::Discover(group) => {
            ui::print_block(term, &format!("กำลังสร้างไอเดียสำหรับ {}...", group.label()));
            let outcome = session.discover(group).await;
            report_ideas(term, session, outcome);
        }
        ReplCommand::More => {
            let outcome = session.load_more().await;
            report_ideas(term, session, outcome);
        }
        ReplCommand::Ideas => ui::print_block(term, &ui::format_ideas(session)),
        ReplCommand::View(index) => {
            let outcome = session.view_detail(index).await;
            report_detail(term, session, outcome);
        }
        ReplCommand::Custom(text) => {
            let outcome = session.custom_generate(&text).await;
            report_detail(term, session, outcome);
        }
        ReplCommand::Refine(instruction) => {
            let outcome = session.refine(&instruction).await;
            report_detail(term, session, outcome);
        }
        ReplCommand::Show => {
            if session.detail_view().is_none() {
                ui::print_error(term, "ยังไม่ได้เปิดข้อเสนอโครงการ");
            } else {
                show_detail(term, session);
            }
        }
        ReplCommand::Edit => {
            session.begin_edit()?;
            ui::print_done(term, "เข้าสู่โหมดแก้ไข");
        }
        ReplCommand::Set(field, value) => {
            session.set_draft_field(field, &value)?;
            ui::print_done(term, &format!("แก้ไข {} แล้ว", field.name()));
        }
        ReplCommand::Save => {
            session.save_edit()?;
            ui::print_done(term, "บันทึกการแก้ไขแล้ว");
            show_detail(term, session);
        }
        ReplCommand::Cancel => {
            session.cancel_edit()?;
            ui::print_done(term, "ยกเลิกการแก้ไขแล้ว");
        }
        ReplCommand::Toggle => {
            if session.toggle_save()? {
                ui::print_done(term, "บันทึกกิจกรรมแล้ว");
            } else {
                ui::print_done(term, "นำออกจากรายการที่บันทึกแล้ว");
            }
        }
        ReplCommand::Saved => ui::print_block(term, &ui::format_saved_list(session.store().list())),
        ReplCommand::Open(raw) => {
            let id = resolve_saved_id(session, &raw);
            session.open_saved(&id)?;
            show_detail(term, session);
        }
        ReplCommand::Delete(raw) => {
            let id = resolve_saved_id(session, &raw);
            if session.delete_saved(&id)? {
                ui::print_done(term, "ลบแล้ว");
            } else {
                ui::print_error(term, &format!("no saved proposal with id {id}"));
            }
        }
        ReplCommand::Share => {
            let detail = session
                .detail_view()
                .and_then(|view| view.detail())
                .ok_or_else(|| anyhow!("no proposal is displayed"))?;
            ui::print_block(term, &share_text(detail));
        }
        ReplCommand::Close => session.close_detail(),
        ReplCommand::Help => ui::print_block(term, HELP),
        ReplCommand::Quit => return Ok(false),
    }
    Ok(true)
}

pub async fn run_repl(root: &Path) -> Result<()> {
    let config = load_config(&root.join("config"))?;
    let mut session = Session::open(&config, root);
    let term = Term::stdout();

    ui::print_banner(&term);
    if !session.generator().is_configured() {
        ui::print_error(
            &term,
            "GEMINI_API_KEY is not set; generation commands will fail until it is configured",
        );
    }
    println!("---");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        if input.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&input) {
            Ok(command) => command,
            Err(err) => {
                ui::print_error(&term, &err.to_string());
                continue;
            }
        };
        match dispatch(&term, &mut session, command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => ui::print_error(&term, &format!("{err:#}")),
        }
    }

    Ok(())
}

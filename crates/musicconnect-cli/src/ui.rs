use chrono::{Local, TimeZone};
use console::{style, Emoji, Term};
use musicconnect_core::{DetailStatus, DetailView, IdeasPhase, Session};
use musicconnect_schema::{ActivityDetail, ActivitySummary, SavedActivity, TargetGroup};

pub static CHECKMARK: Emoji<'_, '_> = Emoji("✅ ", "√ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "x ");
pub static STAR: Emoji<'_, '_> = Emoji("⭐ ", "* ");
pub static NOTE: Emoji<'_, '_> = Emoji("🎵 ", "");

pub fn print_banner(term: &Term) {
    let _ = term.write_line(&format!(
        "{}{} {}",
        NOTE,
        style("Music Connect").bold().cyan(),
        style("สำหรับนักศึกษาเอกดนตรีสากล").dim()
    ));
    let _ = term.write_line("พิมพ์ 'help' เพื่อดูคำสั่ง, 'quit' เพื่อออก");
}

pub fn print_done(term: &Term, msg: &str) {
    let _ = term.write_line(&format!("{} {}", CHECKMARK, style(msg).green()));
}

pub fn print_error(term: &Term, msg: &str) {
    let _ = term.write_line(&format!("{} {}", CROSS, style(msg).red()));
}

pub fn print_block(term: &Term, text: &str) {
    let _ = term.write_line(text);
}

pub fn format_groups() -> String {
    TargetGroup::ALL
        .iter()
        .enumerate()
        .map(|(i, group)| {
            format!(
                "{:>2}. {} {:<12} {}",
                i + 1,
                group.icon(),
                group.id(),
                group.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_idea(index: usize, idea: &ActivitySummary) -> String {
    format!(
        "{:>2}. {} [{}]\n    {}\n    {} | {} | {}",
        index + 1,
        style(&idea.title).bold(),
        idea.difficulty,
        idea.description,
        idea.duration,
        idea.impact_area,
        idea.tags.join(", ")
    )
}

pub fn format_ideas(session: &Session) -> String {
    let mut out = Vec::new();
    if let Some(group) = session.active_group() {
        out.push(format!("{} {}", group.icon(), style(group.label()).bold()));
    }
    out.extend(
        session
            .ideas()
            .iter()
            .enumerate()
            .map(|(i, idea)| format_idea(i, idea)),
    );
    match session.ideas_phase() {
        IdeasPhase::Loading => out.push("กำลังสร้างไอเดีย...".to_string()),
        IdeasPhase::LoadingMore => out.push("กำลังโหลดเพิ่มเติม...".to_string()),
        IdeasPhase::Idle => {}
    }
    if let Some(err) = session.ideas_error() {
        out.push(format!("{}", style(err).red()));
    }
    if out.is_empty() {
        out.push("ยังไม่มีไอเดีย ลองใช้คำสั่ง 'discover <group>'".to_string());
    }
    out.join("\n")
}

fn push_list(out: &mut Vec<String>, heading: &str, items: &[String], numbered: bool) {
    out.push(format!("{}", style(heading).bold().cyan()));
    for (i, item) in items.iter().enumerate() {
        if numbered {
            out.push(format!("  {}. {item}", i + 1));
        } else {
            out.push(format!("  - {item}"));
        }
    }
}

pub fn format_detail(detail: &ActivityDetail) -> String {
    let mut out = vec![
        format!("{}", style(&detail.title).bold().underlined()),
        detail.full_description.clone(),
    ];
    push_list(&mut out, "วัตถุประสงค์", &detail.objectives, false);
    out.push(format!("{}", style("กลุ่มเป้าหมาย").bold().cyan()));
    out.push(format!("  {}", detail.target_audience_detail));
    push_list(&mut out, "ขั้นตอนการดำเนินงาน", &detail.step_by_step_plan, true);
    push_list(&mut out, "อุปกรณ์ที่ต้องใช้", &detail.required_equipment, false);
    out.push(format!("{}", style("งบประมาณ").bold().cyan()));
    out.push(format!("  {}", detail.budget_estimate));
    push_list(&mut out, "ตัวชี้วัดความสำเร็จ", &detail.evaluation_metrics, false);
    out.join("\n")
}

pub fn format_detail_view(view: &DetailView, saved: bool) -> String {
    let mut out = Vec::new();
    match view.status() {
        DetailStatus::Loading => out.push("กำลังสร้างข้อเสนอโครงการ...".to_string()),
        DetailStatus::Failed(message) => out.push(format!("{}", style(message).red())),
        DetailStatus::Ready(_) => {
            if let Some(shown) = view.displayed() {
                out.push(format_detail(shown));
            }
        }
    }

    let mut flags = Vec::new();
    if let Some(label) = view.origin_label() {
        flags.push(label.to_string());
    }
    if saved {
        flags.push(format!("{STAR}บันทึกแล้ว"));
    }
    if view.is_editing() {
        flags.push("กำลังแก้ไข ('save' เพื่อยืนยัน, 'cancel' เพื่อยกเลิก)".to_string());
    }
    if view.is_refining() {
        flags.push("กำลังปรับแก้ด้วย AI...".to_string());
    }
    if !flags.is_empty() {
        out.push(format!("{}", style(flags.join(" | ")).dim()));
    }
    if let Some(err) = view.refine_error() {
        out.push(format!("{}", style(err).red()));
    }
    out.join("\n")
}

fn format_saved_at(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| millis.to_string())
}

pub fn format_saved_list(items: &[SavedActivity]) -> String {
    if items.is_empty() {
        return "ยังไม่มีกิจกรรมที่บันทึกไว้".to_string();
    }
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{:>2}. {}\n    id: {} | {} | {}",
                i + 1,
                style(item.title()).bold(),
                item.id,
                item.target_group_label.as_deref().unwrap_or("-"),
                format_saved_at(item.saved_at)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

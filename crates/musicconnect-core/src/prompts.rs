use musicconnect_schema::{
    activity_detail_schema, activity_summary_list_schema, ActivityDetail, TargetGroup,
};
use serde_json::Value;

/// Number of ideas requested per batch.
pub const IDEAS_PER_BATCH: usize = 5;
pub const DEFAULT_PLANNING_HORIZON: &str = "3 เดือน";
pub const DEFAULT_BUDGET_BAND: &str = "20,000 - 30,000 บาท";

const ADVISOR_ROLE: &str = "คุณเป็นอาจารย์ที่ปรึกษาด้านดนตรีสากลและกิจกรรมเพื่อสังคม";

const DETAIL_FIELD_GUIDE: &[&str] = &[
    "ตอบกลับเป็น JSON Object ตามโครงสร้างนี้:",
    "- title: string (ชื่อกิจกรรม)",
    "- fullDescription: string (รายละเอียดกิจกรรม แบบบรรยาย 1 ย่อหน้า)",
    "- objectives: array of strings (วัตถุประสงค์ 3-5 ข้อ)",
    "- targetAudienceDetail: string (วิเคราะห์กลุ่มเป้าหมายและสิ่งที่ต้องระวัง)",
    "- stepByStepPlan: array of strings (ขั้นตอนการดำเนินงานแบ่งตามช่วงเวลา ตั้งแต่เตรียมงาน ดำเนินกิจกรรม จนถึงสรุปผล)",
    "- requiredEquipment: array of strings (อุปกรณ์ที่ต้องใช้ ทั้งเครื่องดนตรีและอุปกรณ์เสริม)",
    "- budgetEstimate: string (ประมาณการงบประมาณแยกเป็นรายการ พร้อมยอดรวม)",
    "- evaluationMetrics: array of strings (ตัวชี้วัดความสำเร็จ)",
];

/// Prompt text plus the response schema the endpoint must follow.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationPrompt {
    pub text: String,
    pub schema: Value,
}

pub fn idea_list_prompt(group: TargetGroup, existing_titles: &[String]) -> GenerationPrompt {
    let audience = group.description();
    let mut lines = vec![
        ADVISOR_ROLE.to_string(),
        format!(
            "ช่วยคิดกิจกรรมสร้างสรรค์ใหม่ {IDEAS_PER_BATCH} กิจกรรม สำหรับ \"นักศึกษาเอกดนตรีสากล\" เพื่อไปจัดกิจกรรมให้แก่ \"{audience}\""
        ),
    ];

    if !existing_titles.is_empty() {
        lines.push(format!(
            "สำคัญมาก: กิจกรรมใหม่ต้องไม่ซ้ำกับกิจกรรมที่เคยเสนอไปแล้วเหล่านี้: {}",
            existing_titles.join(", ")
        ));
    }

    lines.extend(
        [
            "",
            "กิจกรรมต้องมีความหลากหลายและไม่ซ้ำแนวกัน (เช่น การแสดง, การสอน, ดนตรีบำบัดเบื้องต้น, การ workshop)",
            "และต้องเหมาะสมกับบริบทของกลุ่มเป้าหมาย",
            "",
            "ตอบกลับเป็น JSON Array โดยแต่ละรายการมีโครงสร้างดังนี้:",
            "- id: string (รหัสที่ไม่ซ้ำกันภายในชุดนี้)",
            "- title: string (ชื่อกิจกรรมที่น่าสนใจ)",
            "- description: string (คำอธิบายสั้นๆ ประมาณ 2 ประโยค)",
            "- tags: array of strings (เช่น \"Performance\", \"Workshop\", \"Music Therapy\", \"Fun\")",
            "- duration: string (ระยะเวลาที่ใช้ เช่น \"2 ชั่วโมง\", \"ครึ่งวัน\")",
            "- difficulty: string (ระดับความยากในการเตรียมงาน: \"Low\", \"Medium\", \"High\")",
            "- impactArea: string (ด้านที่พัฒนา เช่น \"Mental Health\", \"Education\", \"Social Bond\")",
        ]
        .map(str::to_string),
    );

    GenerationPrompt {
        text: lines.join("\n"),
        schema: activity_summary_list_schema(),
    }
}

pub fn detail_from_title_prompt(title: &str, group: TargetGroup) -> GenerationPrompt {
    let audience = group.description();
    let mut lines = vec![
        ADVISOR_ROLE.to_string(),
        format!("ช่วยเขียน \"ข้อเสนอโครงการ\" (Project Proposal) อย่างละเอียด สำหรับกิจกรรมชื่อ \"{title}\""),
        format!("ซึ่งจัดโดยนักศึกษาเอกดนตรีสากล เพื่อกลุ่มเป้าหมายคือ \"{audience}\""),
        String::new(),
        "ขอให้เนื้อหามีความละเอียด เป็นมืออาชีพ และนำไปใช้จริงได้".to_string(),
        format!("ระยะเวลาดำเนินโครงการ: {DEFAULT_PLANNING_HORIZON}"),
        format!("งบประมาณโดยประมาณ: {DEFAULT_BUDGET_BAND}"),
        "แบ่งขั้นตอนการดำเนินงานตามช่วงเวลา: ช่วงเตรียมงาน, ช่วงดำเนินกิจกรรม และช่วงสรุปผล".to_string(),
        String::new(),
    ];
    lines.extend(DETAIL_FIELD_GUIDE.iter().map(|line| line.to_string()));

    GenerationPrompt {
        text: lines.join("\n"),
        schema: activity_detail_schema(),
    }
}

pub fn detail_from_freeform_prompt(request: &str) -> GenerationPrompt {
    let mut lines = vec![
        ADVISOR_ROLE.to_string(),
        "นักศึกษาเอกดนตรีสากลต้องการจัดกิจกรรมตามคำขอต่อไปนี้:".to_string(),
        format!("\"{request}\""),
        String::new(),
        "ช่วยเขียน \"ข้อเสนอโครงการ\" (Project Proposal) อย่างละเอียด เป็นมืออาชีพ และนำไปใช้จริงได้".to_string(),
        "หากคำขอระบุงบประมาณหรือระยะเวลาไว้ ให้ใช้ตัวเลขนั้นตามที่ระบุทุกประการ".to_string(),
        format!(
            "หากคำขอไม่ได้ระบุทั้งงบประมาณและระยะเวลา ให้ใช้ระยะเวลา {DEFAULT_PLANNING_HORIZON} และงบประมาณ {DEFAULT_BUDGET_BAND}"
        ),
        "วิเคราะห์กลุ่มเป้าหมายจากบริบทของคำขอ".to_string(),
        String::new(),
    ];
    lines.extend(DETAIL_FIELD_GUIDE.iter().map(|line| line.to_string()));

    GenerationPrompt {
        text: lines.join("\n"),
        schema: activity_detail_schema(),
    }
}

/// Round-trips `current` through the model with `instruction` applied.
pub fn refine_prompt(
    current: &ActivityDetail,
    instruction: &str,
) -> serde_json::Result<GenerationPrompt> {
    let serialized = serde_json::to_string_pretty(current)?;
    let lines = [
        ADVISOR_ROLE.to_string(),
        "นี่คือข้อเสนอโครงการปัจจุบันในรูปแบบ JSON:".to_string(),
        serialized,
        String::new(),
        format!("ปรับแก้ข้อเสนอโครงการตามคำสั่งนี้อย่างเคร่งครัด: \"{instruction}\""),
        "คงโครงสร้างและชื่อฟิลด์ทั้งหมดไว้เหมือนเดิม และตอบกลับเป็น JSON Object ฉบับสมบูรณ์".to_string(),
        "หากการแก้ไขส่งผลต่อส่วนอื่น ให้ปรับส่วนนั้นให้สอดคล้องกันด้วย เช่น ลดงบประมาณแล้วต้องลดรายการอุปกรณ์ตามไปด้วย".to_string(),
    ];

    Ok(GenerationPrompt {
        text: lines.join("\n"),
        schema: activity_detail_schema(),
    })
}

use musicconnect_schema::ActivityDetail;

pub const SHARE_SIGNATURE: &str = "สร้างโดย Music Connect - ผู้ช่วยออกแบบกิจกรรมดนตรีเพื่อสังคม";

/// Plain-text summary for clipboard or share sheets.
pub fn share_text(detail: &ActivityDetail) -> String {
    let mut out = Vec::new();
    out.push(format!("🎵 {}", detail.title));
    out.push(String::new());
    out.push("📝 รายละเอียด".to_string());
    out.push(detail.full_description.clone());
    out.push(String::new());

    out.push("🎯 วัตถุประสงค์".to_string());
    out.extend(detail.objectives.iter().map(|item| format!("• {item}")));
    out.push(String::new());

    out.push("📋 ขั้นตอนการดำเนินงาน".to_string());
    out.extend(
        detail
            .step_by_step_plan
            .iter()
            .enumerate()
            .map(|(i, step)| format!("{}. {step}", i + 1)),
    );
    out.push(String::new());

    out.push("🎸 อุปกรณ์ที่ต้องใช้".to_string());
    out.extend(detail.required_equipment.iter().map(|item| format!("• {item}")));
    out.push(String::new());

    out.push(SHARE_SIGNATURE.to_string());
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_text_lists_sections_in_order() {
        let detail = ActivityDetail {
            title: "ดนตรีในสวน".into(),
            full_description: "เล่นดนตรีแจ๊สในสวนสาธารณะทุกวันอาทิตย์".into(),
            objectives: vec!["สร้างพื้นที่สร้างสรรค์".into(), "ฝึกการแสดงสด".into()],
            step_by_step_plan: vec!["ขออนุญาตสถานที่".into(), "ซ้อมวง".into()],
            required_equipment: vec!["ลำโพง".into()],
            budget_estimate: "ไม่ควรปรากฏ".into(),
            ..ActivityDetail::default()
        };

        let text = share_text(&detail);
        assert!(text.starts_with("🎵 ดนตรีในสวน\n"));
        assert!(text.contains("• สร้างพื้นที่สร้างสรรค์\n• ฝึกการแสดงสด"));
        assert!(text.contains("1. ขออนุญาตสถานที่\n2. ซ้อมวง"));
        assert!(text.contains("• ลำโพง"));
        assert!(text.ends_with(SHARE_SIGNATURE));
        assert!(!text.contains("ไม่ควรปรากฏ"));

        let objectives = text.find("🎯").unwrap();
        let steps = text.find("📋").unwrap();
        let equipment = text.find("🎸").unwrap();
        assert!(objectives < steps && steps < equipment);
    }

    #[test]
    fn share_text_handles_empty_lists() {
        let text = share_text(&ActivityDetail {
            title: "ว่าง".into(),
            ..ActivityDetail::default()
        });
        assert!(text.contains("🎯 วัตถุประสงค์\n\n📋"));
    }
}

// 文件大小按 1000 进制计算，和系统文件管理器显示一致

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

pub fn format_bytes(count: u64) -> String {
    if count < 1000 {
        return format!("{} {}", count, UNITS[0]);
    }
    let mut value = count as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}

//! Label aliases for the Russian and English exports
//!
//! Each lookup tries the aliases in order; the first one that resolves wins.

/// Mandatory overview section
pub const SUMMARY_SECTION: &str = "summary";
pub const MOTHERBOARD_SECTION: &str = "motherboard";
pub const BIOS_SECTION: &str = "bios";
pub const SMART_SECTION: &str = "smart";

pub const COMPUTER_NAME: &[&str] = &["Имя компьютера", "Computer Name"];
pub const OPERATING_SYSTEM: &[&str] = &["Операционная система", "Operating System"];
pub const CPU_TYPE: &[&str] = &["Тип ЦП", "CPU Type"];
pub const MOTHERBOARD: &[&str] = &["Системная плата", "Motherboard Name"];
pub const VIDEO_ADAPTER: &[&str] = &["Видеоадаптер", "Video Adapter"];
pub const MONITOR: &[&str] = &["Монитор", "Monitor"];
pub const SYSTEM_MEMORY: &[&str] = &["Системная память", "System Memory"];
pub const PRIMARY_IP: &[&str] = &["Первичный адрес IP", "Primary IP Address"];
pub const PRIMARY_MAC: &[&str] = &["Первичный адрес MAC", "Primary MAC Address"];
pub const DISK_DRIVE: &[&str] = &["Дисковый накопитель", "Disk Drive"];
pub const PRINTER: &[&str] = &["Принтер", "Printer"];
pub const CPU_SOCKETS: &[&str] = &["Разъёмы для ЦП", "Разъемы для ЦП", "CPU Sockets"];
pub const BIOS_DATE: &[&str] = &["Дата BIOS системы", "System BIOS Date"];

pub const MODULE_SIZE: &[&str] = &["Размер модуля", "Module Size", "Размер", "Size"];
pub const MEMORY_TYPE: &[&str] = &["Тип памяти", "Memory Type", "Тип устройства", "Device Type"];
pub const MEMORY_SPEED: &[&str] = &["Скорость памяти", "Memory Speed", "Скорость", "Speed"];

/// Per-slot label in the overview table, e.g. "DIMM3: Kingston 99U5584"
pub const DIMM_LABEL_PATTERN: &str = r"(?i)\bDIMM\s?\d+\s*:";

/// Memory detail headers; DMI device lists name every slot, SPD only populated ones
pub const MEMORY_DEVICE_HEADER_PATTERN: &str = r"\[\s*(?:Устройства памяти|Memory Devices)\s*/";
pub const SPD_HEADER_PATTERN: &str = r"\[\s*SPD\s*/";

/// "4 DDR4 DIMM", "2 DDR3 SO-DIMM" in a motherboard description
pub const SLOT_COUNT_PATTERN: &str = r"(?i)\b(\d+)\s+(?:[\w-]+\s+)?(?:SO-)?DIMM";

/// Timing parenthesis after a module size
pub const TIMING_SUFFIX_PATTERN: &str = r"\s*\(.*\)";

use crate::error::Result;
use crate::row::ProductionRow;
use std::io::{Cursor, Write};
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub const ALL_ARCHIVE_NAME: &str = "VEO_FACTORY_ALL.zip";
pub const ALL_FOLDER_NAME: &str = "VEO_ASSETS_ALL";
pub const PROMPTS_FILE_NAME: &str = "prompts.txt";

/// 内存中的压缩包，交给宿主保存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 单行包和总包中的行目录名
pub fn row_folder_name(row: &ProductionRow) -> String {
    format!("Line_{}", row.id)
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

fn write_row<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    folder: &str,
    row: &ProductionRow,
) -> Result<()> {
    zip.add_directory(format!("{}/", folder), entry_options())?;

    for (i, concept) in row.concepts.iter().enumerate() {
        let name = format!("{}/Concept_{}.{}", folder, i + 1, concept.image.extension());
        zip.start_file(name, entry_options())?;
        zip.write_all(&concept.image.decode()?)?;
    }

    if let Some(script) = &row.script {
        zip.start_file(format!("{}/{}", folder, PROMPTS_FILE_NAME), entry_options())?;
        zip.write_all(script.prompt_sheet().as_bytes())?;
    }
    Ok(())
}

/// 打包单行为 `Line_{id}.zip`；缺少概念图或脚本时返回 `None`
///
/// 条目使用固定时间戳，同一行重复打包得到相同字节。
pub fn package_row(row: &ProductionRow) -> Result<Option<Archive>> {
    if !row.is_ready_for_packaging() {
        return Ok(None);
    }

    let folder = row_folder_name(row);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    write_row(&mut zip, &folder, row)?;
    let bytes = zip.finish()?.into_inner();

    info!(row = row.id, size = bytes.len(), "Packaged line archive");
    Ok(Some(Archive {
        file_name: format!("{}.zip", folder),
        bytes,
    }))
}

/// 把所有就绪的行打包到同一个顶层目录，未就绪的行跳过
pub fn package_all_rows(rows: &[ProductionRow]) -> Result<Option<Archive>> {
    let ready: Vec<&ProductionRow> = rows.iter().filter(|r| r.is_ready_for_packaging()).collect();
    if ready.is_empty() {
        return Ok(None);
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.add_directory(format!("{}/", ALL_FOLDER_NAME), entry_options())?;
    for row in &ready {
        let folder = format!("{}/{}", ALL_FOLDER_NAME, row_folder_name(row));
        write_row(&mut zip, &folder, row)?;
    }
    let bytes = zip.finish()?.into_inner();

    info!(lines = ready.len(), size = bytes.len(), "Packaged all-lines archive");
    Ok(Some(Archive {
        file_name: ALL_ARCHIVE_NAME.to_string(),
        bytes,
    }))
}

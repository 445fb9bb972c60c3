mod report_dto;

pub use report_dto::{
    DateOrderDto, ReportDetailResponseDto, ReportListItemDto, ReportQueryDto, ResolveReportDto,
    ResolveReportResponseDto, StatusFilterDto,
};

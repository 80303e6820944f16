use crate::{
    api::{attendance, classes, homework, marks, students, subjects, teachers, timetable},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_else(|| {
                tracing::warn!(requests_per_min, "Invalid rate limit, using governor defaults");
                GovernorConfig::default()
            });
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Malformed bodies, paths and queries answer with the usual error body
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, _| ApiError::validation(err.to_string()).into()),
    )
    .app_data(web::PathConfig::default().error_handler(|err, _| ApiError::validation(err.to_string()).into()))
    .app_data(web::QueryConfig::default().error_handler(|err, _| ApiError::validation(err.to_string()).into()));

    // Public routes
    cfg.service(
        web::resource("/Login")
            .wrap(login_limiter)
            .route(web::post().to(handlers::login)),
    )
    .service(
        web::resource("/AdminReg")
            .wrap(register_limiter)
            .route(web::post().to(handlers::admin_register)),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(web::resource("/Admin/{id}").route(web::get().to(handlers::admin_detail)))
            // classes
            .service(web::resource("/SclassCreate").route(web::post().to(classes::create_class)))
            .service(web::resource("/SclassList/{id}").route(web::get().to(classes::list_classes)))
            .service(web::resource("/Sclass/Students/{id}").route(web::get().to(classes::class_students)))
            .service(
                web::resource("/Sclass/{id}")
                    .route(web::get().to(classes::class_detail))
                    .route(web::delete().to(classes::delete_class)),
            )
            .service(web::resource("/Sclasses/{id}").route(web::delete().to(classes::delete_school_classes)))
            // subjects
            .service(web::resource("/SubjectCreate").route(web::post().to(subjects::create_subjects)))
            .service(web::resource("/AllSubjects/{id}").route(web::get().to(subjects::school_subjects)))
            .service(web::resource("/ClassSubjects/{id}").route(web::get().to(subjects::class_subjects)))
            .service(web::resource("/FreeSubjectList/{id}").route(web::get().to(subjects::free_subjects)))
            .service(
                web::resource("/Subject/{id}")
                    .route(web::get().to(subjects::subject_detail))
                    .route(web::delete().to(subjects::delete_subject)),
            )
            // students
            .service(web::resource("/StudentReg").route(web::post().to(students::register_student)))
            .service(web::resource("/Students/{id}").route(web::get().to(students::list_students)))
            .service(
                web::resource("/Student/{id}")
                    .route(web::get().to(students::student_detail))
                    .route(web::put().to(students::update_student))
                    .route(web::delete().to(students::delete_student)),
            )
            .service(web::resource("/UpdateExamResult/{id}").route(web::put().to(students::update_exam_result)))
            // teachers
            .service(web::resource("/TeacherReg").route(web::post().to(teachers::register_teacher)))
            .service(web::resource("/Teachers/{id}").route(web::get().to(teachers::list_teachers)))
            .service(
                web::resource("/Teacher/{id}")
                    .route(web::get().to(teachers::teacher_detail))
                    .route(web::put().to(teachers::update_teacher))
                    .route(web::delete().to(teachers::delete_teacher)),
            )
            .service(web::resource("/TeacherSubject").route(web::put().to(teachers::assign_subject)))
            .service(web::resource("/assign-class").route(web::put().to(teachers::assign_class)))
            .service(web::resource("/assign-class-teacher").route(web::post().to(teachers::assign_class_teacher)))
            .service(
                web::scope("/Attendance")
                    // /Attendance/Mark
                    .service(web::resource("/Mark").route(web::post().to(attendance::mark_attendance)))
                    // /Attendance/Student/{studentId}
                    .service(
                        web::resource("/Student/{studentId}").route(web::get().to(attendance::student_attendance)),
                    )
                    // /Attendance/{sclassId}
                    .service(web::resource("/{sclassId}").route(web::get().to(attendance::class_attendance))),
            )
            .service(
                web::scope("/timetable")
                    .service(web::resource("").route(web::post().to(timetable::add_entries)))
                    .service(web::resource("/class/{classId}").route(web::get().to(timetable::class_timetable)))
                    .service(
                        web::resource("/teacher/{teacherId}").route(web::get().to(timetable::teacher_timetable)),
                    )
                    .service(
                        web::resource("/student/{studentId}").route(web::get().to(timetable::student_timetable)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(timetable::update_entry))
                            .route(web::delete().to(timetable::delete_entry)),
                    ),
            )
            .service(
                web::scope("/Homework")
                    // /Homework
                    .service(web::resource("").route(web::post().to(homework::create_homework)))
                    // fixed segments before /Homework/{homeworkId}
                    .service(web::resource("/Student").route(web::get().to(homework::student_homework)))
                    .service(web::resource("/Teacher").route(web::get().to(homework::teacher_homework)))
                    .service(web::resource("/Class/{className}").route(web::get().to(homework::homework_by_class)))
                    .service(
                        web::resource("/Submit/{homeworkId}").route(web::post().to(homework::submit_homework)),
                    )
                    .service(
                        web::resource("/{homeworkId}/Grade").route(web::put().to(homework::grade_submission)),
                    )
                    .service(
                        web::resource("/{homeworkId}")
                            .route(web::put().to(homework::update_homework))
                            .route(web::delete().to(homework::delete_homework)),
                    ),
            )
            .service(
                web::scope("/marks")
                    .service(web::resource("/add").route(web::post().to(marks::add_marks)))
                    .service(web::resource("/teacher/{id}").route(web::get().to(marks::teacher_marks)))
                    .service(web::resource("/student/{id}").route(web::get().to(marks::student_marks)))
                    .service(web::resource("/subject/{id}").route(web::get().to(marks::subject_marks)))
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(marks::update_marks))
                            .route(web::delete().to(marks::delete_marks)),
                    ),
            ),
    );
}

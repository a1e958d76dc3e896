use std::io::Read;

use anyhow::Context;
use sqlx::PgPool;

use crate::models::{Enrollment, NewStudent, Student};

pub async fn register_student(pool: &PgPool, student: &NewStudent) -> anyhow::Result<Student> {
    let created = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (name, birth_date, email)
        VALUES ($1, $2, $3)
        RETURNING id, name, birth_date, email, created_at
        "#,
    )
    .bind(&student.name)
    .bind(student.birth_date)
    .bind(&student.email)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to register student {}", student.name))?;

    Ok(created)
}

pub async fn enroll_student(
    pool: &PgPool,
    student_id: i64,
    class_id: i64,
) -> anyhow::Result<Enrollment> {
    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (student_id, class_id)
        VALUES ($1, $2)
        RETURNING id, student_id, class_id, created_at
        "#,
    )
    .bind(student_id)
    .bind(class_id)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to enroll student {student_id} in class {class_id}"))?;

    Ok(enrollment)
}

/// Parses `name,birth_date,email` rows; an empty email becomes `None`.
pub fn read_students_csv<R: Read>(input: R) -> anyhow::Result<Vec<NewStudent>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut students = Vec::new();

    for (index, result) in reader.deserialize::<NewStudent>().enumerate() {
        let mut student = result.with_context(|| format!("invalid student on row {}", index + 1))?;
        if student.email.as_deref().is_some_and(|email| email.trim().is_empty()) {
            student.email = None;
        }
        students.push(student);
    }

    Ok(students)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let students = read_students_csv(file)?;
    let mut inserted = 0usize;

    for student in &students {
        register_student(pool, student).await?;
        inserted += 1;
    }

    Ok(inserted)
}
